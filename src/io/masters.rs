//! Master table loading into the Reference Data Store.

use std::path::{Path, PathBuf};

use log::info;

use crate::domain::{BalanceRecord, DataLayout};
use crate::error::PipelineError;
use crate::io::ingest::{read_csv, read_csv_or_empty};
use crate::reference::{
    AssetTaxonomy, AssetTaxonomyRow, BalanceTaxonomy, BalanceTaxonomyRow, KeyValueMaster, KeyValueRow, MasterName,
    OffsetRow, OffsetUnrealized, RatePoint, ReferenceData, TargetBalanceParameter, TargetRateCurve,
};

pub fn master_path(layout: &DataLayout, name: MasterName) -> PathBuf {
    match name {
        MasterName::AssetTaxonomy => layout.asset_taxonomy(),
        MasterName::BalanceTaxonomy => layout.balance_taxonomy(),
        MasterName::OffsetUnrealized => layout.offset_unrealized(),
        MasterName::TargetRate => layout.target_rate(),
        MasterName::TargetBalanceParameter => layout.target_balance_parameter(),
        MasterName::TargetInitialValue => layout.target_initial_value(),
        MasterName::BalanceTarget => layout.target_balance(),
    }
}

fn non_empty<T>(rows: Vec<T>, path: &Path) -> Result<Vec<T>, PipelineError> {
    if rows.is_empty() {
        return Err(PipelineError::data_load(format!("'{}' has no rows", path.display())));
    }
    Ok(rows)
}

/// Load the named masters into a fresh store.
///
/// Only `names` are read; anything else stays unpopulated so a stage that did
/// not declare it still fails with `MissingReferenceData`.
pub fn load_reference(layout: &DataLayout, names: &[MasterName]) -> Result<ReferenceData, PipelineError> {
    let mut builder = ReferenceData::builder();
    for &name in names {
        let path = master_path(layout, name);
        builder = match name {
            MasterName::AssetTaxonomy => {
                let rows = non_empty(read_csv::<AssetTaxonomyRow>(&path)?, &path)?;
                builder.asset_taxonomy(AssetTaxonomy::from_rows(rows)?)
            }
            MasterName::BalanceTaxonomy => {
                let rows = non_empty(read_csv::<BalanceTaxonomyRow>(&path)?, &path)?;
                builder.balance_taxonomy(BalanceTaxonomy::from_rows(rows)?)
            }
            // No offsets is a valid state.
            MasterName::OffsetUnrealized => {
                builder.offset_unrealized(OffsetUnrealized::from_rows(read_csv_or_empty::<OffsetRow>(&path)?))
            }
            MasterName::TargetRate => {
                let rows = non_empty(read_csv::<RatePoint>(&path)?, &path)?;
                builder.target_rate(TargetRateCurve::new(rows)?)
            }
            MasterName::TargetBalanceParameter => {
                builder.target_balance_parameter(read_csv::<TargetBalanceParameter>(&path)?)
            }
            MasterName::TargetInitialValue => {
                let rows = non_empty(read_csv::<KeyValueRow>(&path)?, &path)?;
                builder.target_initial_value(KeyValueMaster::from_rows(rows))
            }
            MasterName::BalanceTarget => builder.balance_target(read_csv::<BalanceRecord>(&path)?),
        };
        info!("loaded master `{name}` from '{}'", path.display());
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn layout_with(files: &[(&str, &str)]) -> (tempfile::TempDir, DataLayout) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("masters")).unwrap();
        for (name, body) in files {
            fs::write(dir.path().join("masters").join(name), body).unwrap();
        }
        let layout = DataLayout::new(dir.path());
        (dir, layout)
    }

    #[test]
    fn loads_only_requested_masters() {
        let (_dir, layout) = layout_with(&[
            ("asset_taxonomy.csv", "asset_type,category\nBank A,deposit\n"),
            ("balance_taxonomy.csv", "ledger_category,ledger_sub_category,balance_type,category\n"),
        ]);
        let refs = load_reference(&layout, &[MasterName::AssetTaxonomy, MasterName::OffsetUnrealized]).unwrap();

        assert!(refs.has(MasterName::AssetTaxonomy));
        assert!(refs.has(MasterName::OffsetUnrealized));
        assert!(!refs.has(MasterName::BalanceTaxonomy));
        assert_eq!(refs.asset_taxonomy().unwrap().len(), 1);
    }

    #[test]
    fn empty_taxonomy_is_a_load_error() {
        let (_dir, layout) = layout_with(&[(
            "balance_taxonomy.csv",
            "ledger_category,ledger_sub_category,balance_type,category\n",
        )]);
        let err = load_reference(&layout, &[MasterName::BalanceTaxonomy]).unwrap_err();
        assert!(matches!(err, PipelineError::DataLoad(_)));
    }

    #[test]
    fn missing_required_file_is_io() {
        let (_dir, layout) = layout_with(&[]);
        let err = load_reference(&layout, &[MasterName::TargetRate]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
