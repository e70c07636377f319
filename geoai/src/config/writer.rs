//! INI serialisation: [`GeoAiConfig`] → commented `config.ini` text.

use std::path::Path;

use super::file::GeoAiConfig;
use super::size::format_size;

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Renders the configuration as a commented INI document.
pub(super) fn to_config_string(config: &GeoAiConfig) -> String {
    format!(
        r#"[tiles]
; Maximum tiles in one grid; larger areas are rejected before any download
max_tile_count = {}
; Zoom the 2x2 footprint search starts from (providers without a fixed zoom)
search_start_zoom = {}

[http]
; Request timeout for tiles and model weights, in seconds
timeout_secs = {}
user_agent = {}

[cache]
; Where downloaded model weights are kept. Entries never expire.
weights_directory = {}
; In-memory layer in front of the weights directory (KB, MB, GB suffixes)
memory_size = {}

[worker]
; Seconds before an unanswered worker call fails with a timeout
call_timeout_secs = {}
; Queued requests accepted before senders wait
channel_capacity = {}

[logging]
directory = {}
file = {}

[models]
; Host the built-in model weights are downloaded from
base_url = {}
"#,
        config.tiles.max_tile_count,
        config.tiles.search_start_zoom,
        config.http.timeout_secs,
        config.http.user_agent,
        path_to_string(&config.cache.weights_directory),
        format_size(config.cache.memory_size),
        config.worker.call_timeout_secs,
        config.worker.channel_capacity,
        path_to_string(&config.logging.directory),
        config.logging.file,
        config.models.base_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_sections() {
        let text = to_config_string(&GeoAiConfig::default());
        for section in ["[tiles]", "[http]", "[cache]", "[worker]", "[logging]", "[models]"] {
            assert!(text.contains(section), "missing {}", section);
        }
        assert!(text.contains("memory_size = 512MB"));
        assert!(text.contains("max_tile_count = 100"));
    }
}
