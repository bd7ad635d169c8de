// src/catalog/parser.rs

//! Parser for on-disk port metadata files.
//!
//! A port directory contains a `port.toml` describing the core dependencies
//! and the optional features:
//!
//! ```toml
//! name = "curl"
//! depends = ["zlib", "nghttp2[alpn] (linux)"]
//!
//! [[feature]]
//! name = "ssl"
//! depends = ["openssl"]
//! ```

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::port::{PortDescriptor, PortFeature};
use crate::spec::{DependencySpec, CORE_FEATURE};

/// File name of the port metadata inside a port directory.
pub const PORT_FILE_NAME: &str = "port.toml";

#[derive(Debug, Deserialize)]
struct RawPortFile {
    name: String,
    #[serde(default)]
    depends: Vec<String>,
    #[serde(default, rename = "feature")]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    name: String,
    #[serde(default)]
    depends: Vec<String>,
}

/// Parse and validate the contents of a `port.toml`.
pub fn parse_port_file(name: &str, text: &str) -> Result<PortDescriptor> {
    let raw: RawPortFile = toml::from_str(text).map_err(|e| Error::Parse {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    if raw.name != name {
        return Err(Error::Parse {
            name: name.to_string(),
            message: format!("port file declares name '{}'", raw.name),
        });
    }

    let mut port = PortDescriptor::new(raw.name);
    port.depends = parse_depends(name, &raw.depends)?;

    for feature in raw.features {
        if feature.name.is_empty() || feature.name == CORE_FEATURE || feature.name == "*" {
            return Err(Error::Parse {
                name: name.to_string(),
                message: format!("invalid feature name '{}'", feature.name),
            });
        }
        if port.find_feature(&feature.name).is_some() {
            return Err(Error::Parse {
                name: name.to_string(),
                message: format!("duplicate feature '{}'", feature.name),
            });
        }
        port.features.push(PortFeature {
            depends: parse_depends(name, &feature.depends)?,
            name: feature.name,
        });
    }

    Ok(port)
}

fn parse_depends(name: &str, raw: &[String]) -> Result<Vec<DependencySpec>> {
    raw.iter()
        .map(|entry| {
            DependencySpec::parse(entry).map_err(|e| Error::Parse {
                name: name.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}
