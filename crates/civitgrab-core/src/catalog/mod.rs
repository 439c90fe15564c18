//! Import catalogs for InvokeAI.
//!
//! Each downloaded version gets a small fragment file; the reconciler merges
//! all fragments into the master `models.yaml` the downstream tool reads.

mod codec;
mod entry;
mod fragment;
mod reconcile;

pub use codec::{format_key, parse_catalog, quote_string, read_catalog, to_yaml_string, write_catalog};
pub use entry::{Catalog, CatalogEntry};
pub use fragment::{
    build_description, format_bytes, import_format, import_id, Fragment, FragmentBuilder,
    ImportFormat,
};
pub use reconcile::{merge_fragments, ReconcileReport, Reconciler};
