//! Catalog layer merging
//!
//! Layers are applied in order (typically core, extras, user):
//! plugin lists append, mappings override per identifier, settings override
//! field by field.

use super::schema::CatalogFile;

/// Merge catalog layers into one
pub fn merge_catalogs(layers: impl IntoIterator<Item = CatalogFile>) -> CatalogFile {
    let mut merged = CatalogFile::new();
    for layer in layers {
        merge_catalog(&mut merged, layer);
    }
    merged
}

/// Apply one layer on top of `base`
pub fn merge_catalog(base: &mut CatalogFile, layer: CatalogFile) {
    base.settings.overlay(layer.settings);
    base.plugins.extend(layer.plugins);
    for (id, mapping) in layer.mapping {
        if let Some(previous) = base.mapping.insert(id.clone(), mapping) {
            tracing::debug!(id = %id, ?previous, "mapping overridden by later catalog");
        }
    }
}
