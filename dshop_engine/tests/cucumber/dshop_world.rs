use std::{collections::HashMap, fmt::Debug};

use cucumber::World;
use dshop_engine::{outcomes::IngestOutcome, IngestError};

use crate::support::TestSystem;

#[derive(Default, World)]
pub struct DshopWorld {
    pub system: Option<TestSystem>,
    /// Shop ids, by name
    pub shops: HashMap<String, i64>,
    pub last_result: Option<Result<IngestOutcome, IngestError>>,
}

impl Debug for DshopWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DshopWorld ({} shops, last result: {:?})", self.shops.len(), self.last_result)
    }
}

impl DshopWorld {
    pub fn system(&self) -> &TestSystem {
        self.system.as_ref().expect("Engine not initialised")
    }

    pub fn shop_id(&self, name: &str) -> i64 {
        *self.shops.get(name).unwrap_or_else(|| panic!("No shop called {name}"))
    }
}
