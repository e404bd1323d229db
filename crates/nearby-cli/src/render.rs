//! Terminal output for snapshots and photos.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use nearby_places::{ListRow, MapImage, Photo, Snapshot};
use serde::Serialize;

/// Label shown next to the update time.
const SOURCE: &str = "Wikipedia";

/// Compact summary: title lines, source, update and refresh times.
pub fn render_widget(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    let primary = snapshot
        .title
        .primary
        .clone()
        .unwrap_or_else(|| snapshot.location.coordinates().to_string());
    let _ = writeln!(out, "{}", primary);
    if let Some(secondary) = &snapshot.title.secondary {
        let _ = writeln!(out, "  {}", secondary);
    }

    let _ = writeln!(
        out,
        "{} · {} places · updated {}",
        SOURCE,
        snapshot.markers.len(),
        snapshot.fetched_at.with_timezone(&Local).format("%H:%M")
    );
    let _ = writeln!(
        out,
        "refresh after {}",
        snapshot.refresh_after.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if let Some(url) = &snapshot.map_url {
        let _ = writeln!(out, "map: {}", url);
    }
    out
}

fn render_row(out: &mut String, row: &ListRow) {
    let _ = writeln!(out, "{}  {}", row.label, row.title);
    let _ = writeln!(out, "   article:    {}", row.article_url);
    let _ = writeln!(out, "   map:        {}", row.maps_url);
    let _ = writeln!(out, "   directions: {}", row.directions_url);
    if let Some(thumb) = &row.thumbnail_url {
        let _ = writeln!(out, "   thumbnail:  {}", thumb);
    }
}

/// Detail list: the map followed by one labelled entry per marker.
pub fn render_list(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    match &snapshot.map_url {
        Some(url) => {
            let _ = writeln!(out, "Map: {}", url);
        }
        None => {
            let _ = writeln!(out, "Map: unavailable");
        }
    }
    let _ = writeln!(out);

    let rows = snapshot.rows();
    if rows.is_empty() {
        let _ = writeln!(out, "No places found nearby.");
    }
    for row in &rows {
        render_row(&mut out, row);
    }
    out
}

pub fn render_photo(photo: Option<&Photo>) -> String {
    let Some(photo) = photo else {
        return "No photos in the set.\n".to_string();
    };

    let mut out = String::new();
    let title = if photo.title.is_empty() {
        photo.id.as_str()
    } else {
        photo.title.as_str()
    };
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "  image: {}", photo.image_url);
    if let Some(coords) = photo.coordinates {
        let _ = writeln!(out, "  taken at: {}", coords);
    }
    if let Some(taken) = &photo.taken {
        let _ = writeln!(out, "  taken on: {}", taken);
    }
    out
}

#[derive(Serialize)]
struct SnapshotJson<'a> {
    #[serde(flatten)]
    snapshot: &'a Snapshot,
    rows: Vec<ListRow>,
}

/// Snapshot plus its list rows as pretty JSON.
pub fn snapshot_json(snapshot: &Snapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&SnapshotJson {
        snapshot,
        rows: snapshot.rows(),
    })
}

/// Write the map image, adding an extension when `path` has none.
pub fn save_map(image: &MapImage, path: &Path) -> std::io::Result<PathBuf> {
    let path = if path.extension().is_none() {
        path.with_extension(image.extension())
    } else {
        path.to_path_buf()
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &image.bytes)?;
    Ok(path)
}
