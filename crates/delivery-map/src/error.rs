use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("resolution must be positive, got {0}")]
    NonPositiveResolution(f64),

    #[error("width/height must be positive, got {width} x {height}")]
    NonPositiveExtent { width: f64, height: f64 },

    #[error("obstacle at index {index} lies outside the map extent")]
    ObstacleOutsideExtent { index: usize },

    #[error("failed to read map file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("failed to parse map file: {0}")]
    Parse(#[from] toml::de::Error),
}
