//! 記憶體儲存層
//!
//! 以 `RwLock` 保護整份 [`Snapshot`]。交易在複本上執行，
//! 閉包成功才替換原本的快照，失敗時原快照保持不變。
//!
//! 只適合測試與單一行程情境：沒有持久化，也不跨行程共享。

use std::sync::{PoisonError, RwLock};

use mes_core::{MesError, Result};

use crate::snapshot::Snapshot;
use crate::Store;

/// 記憶體儲存層
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<Snapshot>,
}

fn poison_err<T>(_: PoisonError<T>) -> MesError {
    MesError::Storage("鎖已中毒".to_string())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以既有資料建立
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// 取得目前快照的複本
    pub fn snapshot(&self) -> Result<Snapshot> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.clone())
    }
}

impl Store for InMemoryStore {
    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Snapshot) -> Result<T>,
    {
        let state = self.state.read().map_err(poison_err)?;
        f(&state)
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> Result<T>,
    {
        let mut state = self.state.write().map_err(poison_err)?;
        let mut working = state.clone();

        match f(&mut working) {
            Ok(value) => {
                *state = working;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("交易回滾: {}", err);
                Err(err)
            }
        }
    }
}
