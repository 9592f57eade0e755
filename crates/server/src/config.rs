//! Config file and command-line value parsing.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use settlement_engine::replace::ReplaceConfig;
use settlement_engine::world::position::BlockPos;

/// Read a JSON `ReplaceConfig`. Omitted fields keep their defaults; no file
/// at all means all defaults.
pub fn load_replace_config(path: Option<&Path>) -> Result<ReplaceConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<ReplaceConfig>(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ReplaceConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// `X,Y,Z` as integer block coordinates.
pub fn parse_block_pos(s: &str) -> Result<BlockPos> {
    let [x, y, z] = parse_triple::<i64>(s)?;
    Ok(BlockPos::new(x, y, z))
}

/// `X,Y,Z` as a floating point location (observer positions).
pub fn parse_point(s: &str) -> Result<(f64, f64, f64)> {
    let [x, y, z] = parse_triple::<f64>(s)?;
    Ok((x, y, z))
}

fn parse_triple<T>(s: &str) -> Result<[T; 3]>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        bail!("expected X,Y,Z but got '{s}'");
    };
    Ok([
        x.parse().with_context(|| format!("bad x in '{s}'"))?,
        y.parse().with_context(|| format!("bad y in '{s}'"))?,
        z.parse().with_context(|| format!("bad z in '{s}'"))?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates() {
        assert_eq!(parse_block_pos("10, -4,300").unwrap(), BlockPos::new(10, -4, 300));
        assert!(parse_block_pos("1,2").is_err());
        assert!(parse_block_pos("1,2,x").is_err());
        assert_eq!(parse_point("0.5,64,-2.25").unwrap(), (0.5, 64.0, -2.25));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = std::env::temp_dir().join("settlement_test_config");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("replace.json");

        fs::write(&path, r#"{ "max_active_jobs": 4, "removal_batch_size": 100 }"#).unwrap();
        let config = load_replace_config(Some(&path)).unwrap();
        assert_eq!(config.max_active_jobs, 4);
        assert_eq!(config.removal_batch_size, 100);
        assert_eq!(config.dedup_cell_size, ReplaceConfig::default().dedup_cell_size);

        fs::write(&path, r#"{ "dedup_cell_size": 0 }"#).unwrap();
        assert!(load_replace_config(Some(&path)).is_err());
        assert!(load_replace_config(Some(&dir.join("missing.json"))).is_err());
        assert_eq!(load_replace_config(None).unwrap(), ReplaceConfig::default());

        let _ = fs::remove_dir_all(&dir);
    }
}
