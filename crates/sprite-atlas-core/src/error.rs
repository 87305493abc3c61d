use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Failed to decode image '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Nothing to pack{}", tag_suffix(.tag))]
    Empty { tag: Option<String> },
    #[error(
        "Sprite '{name}' ({width}x{height}) does not fit the atlas ({max_width}x{max_height})"
    )]
    Oversized {
        name: String,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("Sprite '{name}' could not be placed: all {bins} bins are full")]
    PackingExhaustion { name: String, bins: usize },
    #[error("Invalid atlas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unknown value '{value}' for option '{option}'")]
    UnknownOption { option: &'static str, value: String },
    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Packing run was cancelled")]
    Cancelled,
}

fn tag_suffix(tag: &Option<String>) -> String {
    match tag {
        Some(t) => format!(" for tag '{t}'"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
