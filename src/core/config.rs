//! Configuration model: folder/size-spec pairs from the command line.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DircapError, Result};
use crate::core::paths::normalize_folder_arg;

/// A user-supplied size limit, before resolution against the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeSpec {
    /// Absolute byte count.
    Bytes(u64),
    /// Percentage of the total capacity of the filesystem holding the folder.
    PercentOfTotal(u8),
}

impl FromStr for SizeSpec {
    type Err = DircapError;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = |details: &str| DircapError::InvalidSizeSpec {
            spec: raw.to_string(),
            details: details.to_string(),
        };

        if let Some(percent_str) = raw.strip_suffix('%') {
            let percent: u8 = percent_str
                .parse()
                .map_err(|_| invalid("percentage must be an integer"))?;
            if percent == 0 || percent > 100 {
                return Err(invalid("percentage must be between 1 and 100"));
            }
            return Ok(Self::PercentOfTotal(percent));
        }

        let bytes: u64 = raw
            .parse()
            .map_err(|_| invalid("expected a byte count or a percentage like \"80%\""))?;
        Ok(Self::Bytes(bytes))
    }
}

/// One tracked folder and its configured size limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSpec {
    /// Normalized absolute folder path.
    pub path: PathBuf,
    /// Size limit as supplied, resolved to a byte cap at startup.
    pub size: SizeSpec,
}

/// Parse the positional CLI arguments into folder specs.
///
/// Arguments alternate folder path and size specification. An odd count means
/// the final folder has no size and the whole configuration is rejected
/// before anything is tracked. A folder repeated later in the list replaces
/// the earlier pair.
pub fn parse_folder_pairs(args: &[String]) -> Result<Vec<FolderSpec>> {
    let mut specs: Vec<FolderSpec> = Vec::with_capacity(args.len() / 2);

    let mut chunks = args.chunks_exact(2);
    for pair in &mut chunks {
        let path = normalize_folder_arg(&pair[0]);
        let size = pair[1].parse::<SizeSpec>()?;
        specs.retain(|existing| existing.path != path);
        specs.push(FolderSpec { path, size });
    }

    if let [dangling] = chunks.remainder() {
        return Err(DircapError::UnpairedArgs {
            path: normalize_folder_arg(dangling),
        });
    }

    Ok(specs)
}
