//! Mesh output formats understood by the compiler

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ForgeError;

/// Output format, selected by the output file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    /// Triangle mesh, used for previews
    Stl,
    /// Archive-based 3D manufacturing format
    #[serde(rename = "3mf")]
    ThreeMf,
    /// Object file format
    Off,
    /// Additive manufacturing format
    Amf,
}

impl MeshFormat {
    /// Formats compiled for a fresh prompt unless configured otherwise
    pub const DEFAULT_SET: [MeshFormat; 2] = [MeshFormat::Stl, MeshFormat::ThreeMf];

    /// Format recompiled on the parameter-edit fast path
    pub const PREVIEW: MeshFormat = MeshFormat::Stl;

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::ThreeMf => "3mf",
            Self::Off => "off",
            Self::Amf => "amf",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "stl" => Some(Self::Stl),
            "3mf" => Some(Self::ThreeMf),
            "off" => Some(Self::Off),
            "amf" => Some(Self::Amf),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for MeshFormat {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        Self::from_extension(trimmed).ok_or_else(|| ForgeError::InvalidConfig {
            key: "format".to_string(),
            value: s.to_string(),
            reason: "expected one of stl, 3mf, off, amf".to_string(),
        })
    }
}

/// Parse a comma separated list such as `stl,3mf`, dropping duplicates
pub fn parse_format_list(list: &str) -> Result<Vec<MeshFormat>, ForgeError> {
    let mut formats = Vec::new();
    for item in list.split(',').filter(|s| !s.trim().is_empty()) {
        let format: MeshFormat = item.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_round_trip() {
        for format in [MeshFormat::Stl, MeshFormat::ThreeMf, MeshFormat::Off, MeshFormat::Amf] {
            assert_eq!(MeshFormat::from_extension(format.extension()), Some(format));
        }
        assert_eq!(MeshFormat::from_path(Path::new("/tmp/a.STL")), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::from_path(Path::new("/tmp/a.scad")), None);
    }

    #[test]
    fn test_parse_format_list() {
        let formats = parse_format_list("stl, .3mf,stl").unwrap();
        assert_eq!(formats, vec![MeshFormat::Stl, MeshFormat::ThreeMf]);

        let err = parse_format_list("stl,obj").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&MeshFormat::ThreeMf).unwrap();
        assert_eq!(json, "\"3mf\"");
        let back: MeshFormat = serde_json::from_str("\"off\"").unwrap();
        assert_eq!(back, MeshFormat::Off);
    }
}
