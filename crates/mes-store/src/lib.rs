//! # MES Store
//!
//! 資料表快照與交易式存取

pub mod memory;
pub mod snapshot;
pub mod stale;

pub use memory::InMemoryStore;
pub use snapshot::{DocumentTable, Snapshot};
pub use stale::StaleTracker;

use mes_core::Result;

/// 交易式儲存層
///
/// `transaction` 內的所有寫入在閉包回傳 `Ok` 時一起提交，
/// 回傳 `Err` 時全部捨棄；讀取端不會看到寫到一半的狀態。
pub trait Store: Send + Sync {
    /// 唯讀存取
    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Snapshot) -> Result<T>;

    /// 全有或全無的寫入
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> Result<T>;
}
