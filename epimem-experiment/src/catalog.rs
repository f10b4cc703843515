use epimem_core::{Catalog, CatalogObject, Room, Timing};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog: Catalog = serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(catalog.normalize())
}

/// Loads `path` if given, otherwise (or on failure) the built-in catalog
pub fn load_or_sample(path: Option<&Path>) -> Catalog {
    let Some(path) = path else {
        return sample_catalog();
    };
    match load_catalog(path) {
        Ok(catalog) => {
            info!(
                "Loaded catalog '{}' from {}: {} rooms, {} familiar, {} new objects",
                catalog.experiment_name,
                path.display(),
                catalog.rooms.len(),
                catalog.familiar_objects.len(),
                catalog.new_objects.len()
            );
            catalog
        }
        Err(e) => {
            warn!("{e}; falling back to the built-in catalog");
            sample_catalog()
        }
    }
}

fn timing_for(index: u32) -> Timing {
    if index <= 5 {
        Timing::Jour
    } else {
        Timing::Nuit
    }
}

/// Ten rooms, ten familiar objects (one per room) and ten novel objects.
///
/// Image references point at the conventional asset layout; anything that is
/// not on disk is replaced by a placeholder at presentation time.
pub fn sample_catalog() -> Catalog {
    let base = "assets/HARMORYC_VR_images_rappels";
    let rooms = (1..=10)
        .map(|i| Room {
            id: format!("room{i}"),
            name: format!("Salle {i}"),
            image: Some(format!("{base}/Start_Room/Room{i}/room{i}.jpg")),
            timing: Some(timing_for(i)),
        })
        .collect();
    let familiar_objects = (1..=10)
        .map(|i| CatalogObject {
            id: format!("OF{i}"),
            name: format!("Objet familier {i}"),
            image: Some(format!("{base}/Objets/Objets_familiers (OF)/OF{i}/OF{i}.jpg")),
            is_familiar: true,
            room_id: Some(format!("room{i}")),
            timing: Some(timing_for(i)),
        })
        .collect();
    let new_objects = (1..=10)
        .map(|i| CatalogObject {
            id: format!("NO{i}"),
            name: format!("Nouvel objet {i}"),
            image: Some(format!("{base}/Objets/Nouveaux_objets (NO)/NO{i}/NO{i}.jpg")),
            is_familiar: false,
            room_id: None,
            timing: None,
        })
        .collect();

    Catalog {
        experiment_name: "HARMORYC_V2".to_string(),
        rooms,
        familiar_objects,
        new_objects,
        ..Catalog::default()
    }
}
