//! CSV snapshots of discovered terrain.
//!
//! A board is recognised by its low-resolution summary: the file name is
//! `map_<sha256>.csv`, where the hash covers the tiles' average
//! difficulties in arbiter order. Row `y` of the file holds the cells with
//! that `y`, comma-separated by ascending `x`, starting at `(0, 0)`.
//!
//! Cells nobody has discovered are written with the average difficulty of
//! the tile that covers them (or 0), so a reloaded snapshot is a complete
//! grid.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use traverse_types::{Cell, LowResTile};

use crate::error::WorldError;
use crate::knowledge::KnowledgeBase;

/// Hex digest identifying a board by its low-resolution summary.
pub fn cache_key(tiles: &[LowResTile]) -> String {
    let mut hasher = Sha256::new();
    for tile in tiles {
        hasher.update(tile.average_difficulty.to_string().as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

/// File name of the snapshot for a board.
pub fn cache_file_name(tiles: &[LowResTile]) -> String {
    format!("map_{}.csv", cache_key(tiles))
}

/// Full path of the snapshot for a board inside `dir`.
pub fn cache_path(dir: &Path, tiles: &[LowResTile]) -> PathBuf {
    dir.join(cache_file_name(tiles))
}

/// Read a snapshot. Returns `Ok(None)` if the file does not exist.
pub fn load(path: &Path) -> Result<Option<Vec<Cell>>, WorldError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(io_error(path)(source)),
    };

    let mut cells = Vec::new();
    for (row, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let y = i32::try_from(row).map_err(|_overflow| WorldError::TooLarge {
            path: path.to_path_buf(),
        })?;
        for (column, value) in line.split(',').enumerate() {
            let x = i32::try_from(column).map_err(|_overflow| WorldError::TooLarge {
                path: path.to_path_buf(),
            })?;
            let difficulty = value.trim().parse::<u32>().map_err(|_invalid| WorldError::Parse {
                path: path.to_path_buf(),
                row,
                column,
                value: value.to_owned(),
            })?;
            cells.push(Cell::new(x, y, difficulty));
        }
    }
    Ok(Some(cells))
}

/// Merge the snapshot for `tiles` (if one exists in `dir`) into `kb`.
///
/// Returns the number of cells that were new to the knowledge base.
pub fn load_into(
    kb: &KnowledgeBase,
    dir: &Path,
    tiles: &[LowResTile],
) -> Result<usize, WorldError> {
    let path = cache_path(dir, tiles);
    let Some(cells) = load(&path)? else {
        debug!(path = %path.display(), "no terrain snapshot");
        return Ok(0);
    };
    let inserted = kb.merge(&cells);
    info!(path = %path.display(), cells = cells.len(), inserted, "terrain snapshot loaded");
    Ok(inserted)
}

/// Write the knowledge base as a snapshot for `tiles` into `dir`.
///
/// The grid spans `(0, 0)` to the largest known coordinates. The file is
/// written next to its final name and renamed into place, so a reader never
/// sees a partial snapshot. Returns `Ok(None)` if there is nothing to save.
pub fn save(
    kb: &KnowledgeBase,
    dir: &Path,
    tiles: &[LowResTile],
) -> Result<Option<PathBuf>, WorldError> {
    let cells: Vec<Cell> = kb
        .snapshot()
        .into_iter()
        .filter(|c| c.x >= 0 && c.y >= 0)
        .collect();
    let (Some(max_x), Some(max_y)) = (
        cells.iter().map(|c| c.x).max(),
        cells.iter().map(|c| c.y).max(),
    ) else {
        return Ok(None);
    };

    let mut text = String::new();
    for y in 0..=max_y {
        for x in 0..=max_x {
            if x > 0 {
                text.push(',');
            }
            let difficulty = kb
                .try_get(x, y)
                .map_or_else(|| tile_average(tiles, x, y), |c| c.difficulty);
            let _ = write!(text, "{difficulty}");
        }
        text.push('\n');
    }

    let path = cache_path(dir, tiles);
    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let partial = path.with_extension("csv.partial");
    fs::write(&partial, text).map_err(io_error(&partial))?;
    fs::rename(&partial, &path).map_err(io_error(&path))?;

    debug!(path = %path.display(), known = cells.len(), "terrain snapshot saved");
    Ok(Some(path))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> WorldError + use<> {
    let path = path.to_path_buf();
    move |source| WorldError::Io { path, source }
}

/// Average difficulty of the first tile covering `(x, y)`, or 0.
fn tile_average(tiles: &[LowResTile], x: i32, y: i32) -> u32 {
    let location = traverse_types::Location::new(x, y);
    tiles
        .iter()
        .find(|t| t.contains(location))
        .map_or(0, |t| t.average_difficulty)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "traverse-cache-{}-{name}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn tiles() -> Vec<LowResTile> {
        vec![
            LowResTile {
                lower_left_x: 0,
                lower_left_y: 0,
                upper_right_x: 1,
                upper_right_y: 2,
                average_difficulty: 7,
            },
            LowResTile {
                lower_left_x: 2,
                lower_left_y: 0,
                upper_right_x: 3,
                upper_right_y: 2,
                average_difficulty: 3,
            },
        ]
    }

    #[test]
    fn key_depends_on_tile_difficulties() {
        let a = cache_key(&tiles());
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        let mut other = tiles();
        other[1].average_difficulty = 4;
        assert_ne!(a, cache_key(&other));
        assert!(cache_file_name(&tiles()).starts_with("map_"));
        assert!(cache_file_name(&tiles()).ends_with(".csv"));
    }

    #[test]
    fn key_of_empty_summary_is_sha256_of_nothing() {
        assert_eq!(
            cache_key(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn save_fills_gaps_with_tile_average_and_reloads() {
        let dir = scratch_dir("roundtrip");
        let kb = KnowledgeBase::from_cells([Cell::new(0, 0, 1), Cell::new(3, 2, 9)]);
        let path = save(&kb, &dir, &tiles()).unwrap().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1,7,3,3\n7,7,3,3\n7,7,3,9\n");

        let fresh = KnowledgeBase::new();
        assert_eq!(load_into(&fresh, &dir, &tiles()).unwrap(), 12);
        assert_eq!(fresh.try_get(3, 2).map(|c| c.difficulty), Some(9));
        assert_eq!(fresh.try_get(1, 1).map(|c| c.difficulty), Some(7));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_snapshot_loads_nothing() {
        let dir = scratch_dir("missing");
        let kb = KnowledgeBase::new();
        assert_eq!(load_into(&kb, &dir, &tiles()).unwrap(), 0);
        assert!(kb.is_empty());
    }

    #[test]
    fn empty_knowledge_base_saves_nothing() {
        let dir = scratch_dir("empty");
        assert!(save(&KnowledgeBase::new(), &dir, &tiles()).unwrap().is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn malformed_entry_is_reported() {
        let dir = scratch_dir("malformed");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.csv");
        fs::write(&path, "1,2\n3,x\n").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            WorldError::Parse { row: 1, column: 1, ref value, .. } if value == "x"
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
