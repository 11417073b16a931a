//! Reference Data Store.
//!
//! Master tables are written once during setup through `ReferenceDataBuilder`
//! and then frozen into `ReferenceData`, which every stage receives by shared
//! reference. There is no process-wide state: each job builds its own store, so
//! nothing carries over between independent runs.
//!
//! Stages declare the `MasterName`s they read. The stage runner checks those
//! declarations with `ReferenceData::ensure` before the first stage executes.

use std::fmt;

use crate::domain::BalanceRecord;
use crate::error::PipelineError;

pub mod masters;

pub use masters::*;

/// Logical role of a master table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MasterName {
    AssetTaxonomy,
    BalanceTaxonomy,
    OffsetUnrealized,
    TargetRate,
    TargetBalanceParameter,
    TargetInitialValue,
    BalanceTarget,
}

impl MasterName {
    pub const ALL: [MasterName; 7] = [
        MasterName::AssetTaxonomy,
        MasterName::BalanceTaxonomy,
        MasterName::OffsetUnrealized,
        MasterName::TargetRate,
        MasterName::TargetBalanceParameter,
        MasterName::TargetInitialValue,
        MasterName::BalanceTarget,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MasterName::AssetTaxonomy => "asset_taxonomy",
            MasterName::BalanceTaxonomy => "balance_taxonomy",
            MasterName::OffsetUnrealized => "offset_unrealized",
            MasterName::TargetRate => "target_rate",
            MasterName::TargetBalanceParameter => "target_balance_parameter",
            MasterName::TargetInitialValue => "target_initial_value",
            MasterName::BalanceTarget => "balance_target",
        }
    }
}

impl fmt::Display for MasterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frozen master tables for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    asset_taxonomy: Option<AssetTaxonomy>,
    balance_taxonomy: Option<BalanceTaxonomy>,
    offset_unrealized: Option<OffsetUnrealized>,
    target_rate: Option<TargetRateCurve>,
    target_balance_parameter: Option<Vec<TargetBalanceParameter>>,
    target_initial_value: Option<KeyValueMaster>,
    balance_target: Option<Vec<BalanceRecord>>,
}

fn require<T>(slot: &Option<T>, name: MasterName) -> Result<&T, PipelineError> {
    slot.as_ref().ok_or(PipelineError::MissingReferenceData(name))
}

impl ReferenceData {
    pub fn builder() -> ReferenceDataBuilder {
        ReferenceDataBuilder::default()
    }

    pub fn has(&self, name: MasterName) -> bool {
        match name {
            MasterName::AssetTaxonomy => self.asset_taxonomy.is_some(),
            MasterName::BalanceTaxonomy => self.balance_taxonomy.is_some(),
            MasterName::OffsetUnrealized => self.offset_unrealized.is_some(),
            MasterName::TargetRate => self.target_rate.is_some(),
            MasterName::TargetBalanceParameter => self.target_balance_parameter.is_some(),
            MasterName::TargetInitialValue => self.target_initial_value.is_some(),
            MasterName::BalanceTarget => self.balance_target.is_some(),
        }
    }

    /// Fail on the first required master that was never populated.
    pub fn ensure(&self, names: &[MasterName]) -> Result<(), PipelineError> {
        match names.iter().find(|n| !self.has(**n)) {
            Some(missing) => Err(PipelineError::MissingReferenceData(*missing)),
            None => Ok(()),
        }
    }

    pub fn asset_taxonomy(&self) -> Result<&AssetTaxonomy, PipelineError> {
        require(&self.asset_taxonomy, MasterName::AssetTaxonomy)
    }

    pub fn balance_taxonomy(&self) -> Result<&BalanceTaxonomy, PipelineError> {
        require(&self.balance_taxonomy, MasterName::BalanceTaxonomy)
    }

    pub fn offset_unrealized(&self) -> Result<&OffsetUnrealized, PipelineError> {
        require(&self.offset_unrealized, MasterName::OffsetUnrealized)
    }

    pub fn target_rate(&self) -> Result<&TargetRateCurve, PipelineError> {
        require(&self.target_rate, MasterName::TargetRate)
    }

    pub fn target_balance_parameter(&self) -> Result<&[TargetBalanceParameter], PipelineError> {
        require(&self.target_balance_parameter, MasterName::TargetBalanceParameter).map(Vec::as_slice)
    }

    pub fn target_initial_value(&self) -> Result<&KeyValueMaster, PipelineError> {
        require(&self.target_initial_value, MasterName::TargetInitialValue)
    }

    pub fn balance_target(&self) -> Result<&[BalanceRecord], PipelineError> {
        require(&self.balance_target, MasterName::BalanceTarget).map(Vec::as_slice)
    }
}

/// Setup-phase writer for `ReferenceData`.
#[derive(Debug, Default)]
pub struct ReferenceDataBuilder {
    data: ReferenceData,
}

impl ReferenceDataBuilder {
    pub fn asset_taxonomy(mut self, master: AssetTaxonomy) -> Self {
        self.data.asset_taxonomy = Some(master);
        self
    }

    pub fn balance_taxonomy(mut self, master: BalanceTaxonomy) -> Self {
        self.data.balance_taxonomy = Some(master);
        self
    }

    pub fn offset_unrealized(mut self, master: OffsetUnrealized) -> Self {
        self.data.offset_unrealized = Some(master);
        self
    }

    pub fn target_rate(mut self, master: TargetRateCurve) -> Self {
        self.data.target_rate = Some(master);
        self
    }

    pub fn target_balance_parameter(mut self, master: Vec<TargetBalanceParameter>) -> Self {
        self.data.target_balance_parameter = Some(master);
        self
    }

    pub fn target_initial_value(mut self, master: KeyValueMaster) -> Self {
        self.data.target_initial_value = Some(master);
        self
    }

    pub fn balance_target(mut self, master: Vec<BalanceRecord>) -> Self {
        self.data.balance_target = Some(master);
        self
    }

    pub fn build(self) -> ReferenceData {
        self.data
    }
}
