//! Sled-backed storage: `CUBES` plus four secondary-index sublevels
//! (spec §4.3).

use crate::config::StoreConfig;
use crate::error::Result;

pub struct Backend {
    pub db: sled::Db,
    pub cubes: sled::Tree,
    pub index_date: sled::Tree,
    pub index_diff: sled::Tree,
    pub index_notify_date: sled::Tree,
    pub index_notify_diff: sled::Tree,
}

impl Backend {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let db = if config.in_memory {
            sled::Config::new().temporary(true).open()?
        } else {
            sled::open(&config.db_name)?
        };
        let cubes = db.open_tree("cubes")?;
        let index_date = db.open_tree("index_date")?;
        let index_diff = db.open_tree("index_diff")?;
        let index_notify_date = db.open_tree("index_notify_date")?;
        let index_notify_diff = db.open_tree("index_notify_diff")?;
        Ok(Self {
            db,
            cubes,
            index_date,
            index_diff,
            index_notify_date,
            index_notify_diff,
        })
    }

    pub fn tree(&self, sublevel: crate::range::Sublevel) -> &sled::Tree {
        use crate::range::Sublevel::*;
        match sublevel {
            Cubes => &self.cubes,
            IndexDate => &self.index_date,
            IndexDiff => &self.index_diff,
            IndexNotifyDate => &self.index_notify_date,
            IndexNotifyDiff => &self.index_notify_diff,
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
