//! README rendering for synced partitions

use crate::services::manifest::Task;

/// README file name inside a partition directory
pub const README_FILE_NAME: &str = "README.md";

/// Render the README of one synced partition
///
/// `version_json` is the raw text of the partition's `version.json`, if any.
/// `data_path` is where the partition lives on shared storage.
pub fn render(
    task: &Task,
    fragments: &[String],
    version_json: Option<&str>,
    data_path: &str,
    window_secs: i64,
) -> String {
    let version = version_json
        .map(str::trim_end)
        .filter(|v| !v.is_empty())
        .unwrap_or("N/A");

    format!(
        "- **Tag:** {time} {name} {window}s
- **Description:**
> Describe what happened
- **Expected behaviour:**
> Describe what should have happened
- **Vehicle software/hardware:**
```json
{version}
```
- **Data path:**
```bash
{data_path}
```
- **Fragments:**
```bash
{fragments}
```
",
        time = task.time,
        name = task.name,
        window = window_secs,
        version = version,
        data_path = data_path,
        fragments = fragments.join(" "),
    )
}
