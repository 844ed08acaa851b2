#![allow(dead_code)]

use model::records::entity::RoamingStatusEntity;
use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

pub const HEADER: &str = "userId,deviceId,location,timestamp,status";

const LOCATIONS: [&str; 5] = ["Seoul", "Tokyo", "Paris", "New York", "London"];
const STATUSES: [&str; 3] = ["CONNECTED", "ROAMING", "DISCONNECTED"];

/// Twenty valid rows. Devices cycle through DEV001..DEV010, so DEV003 and
/// DEV007 each appear twice.
pub fn sample_rows() -> Vec<String> {
    (0..20)
        .map(|i| {
            format!(
                "{},DEV{:03},{},2024-03-01T08:{:02}:00,{}",
                1001 + i,
                (i % 10) + 1,
                LOCATIONS[i % LOCATIONS.len()],
                i,
                STATUSES[i % STATUSES.len()]
            )
        })
        .collect()
}

/// Writes `HEADER` plus `rows` to `dir/name`.
pub fn write_csv(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).expect("write csv fixture");
    path
}

/// Number of lines in a file.
pub fn file_row_count(path: &Path) -> usize {
    let file = File::open(path).expect("open file");
    BufReader::new(file).lines().count()
}

pub fn read_jsonl(path: &Path) -> Vec<RoamingStatusEntity> {
    let file = File::open(path).expect("open jsonl output");
    BufReader::new(file)
        .lines()
        .map(|line| serde_json::from_str(&line.expect("read line")).expect("parse entity"))
        .collect()
}

/// Single `archive_*` directory created under `backup`.
pub fn archive_dir(backup: &Path) -> PathBuf {
    let mut dirs: Vec<_> = fs::read_dir(backup)
        .expect("read backup dir")
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("archive_"))
        })
        .collect();
    assert_eq!(dirs.len(), 1, "expected exactly one archive directory");
    dirs.remove(0)
}

/// True for worker executions named `partition{i}`.
pub fn is_partition(name: &str) -> bool {
    name.strip_prefix("partition")
        .is_some_and(|index| index.parse::<usize>().is_ok())
}
