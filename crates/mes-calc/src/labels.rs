//! 階層編號
//!
//! 對已是前序排列的扁平樹，一次走訪產生 "1"、"1.2"、"1.2.3" 形式的編號。
//! 輸入必須是合法前序（父節點緊接在其子樹之前），由 [`crate::tree::MethodTree::flatten`] 保證。

use mes_core::FlatTreeNode;

/// 逐節點產生階層編號
#[derive(Debug, Clone, Default)]
pub struct PositionLabeler {
    /// 各深度的計數器
    counters: Vec<usize>,
    previous_level: Option<usize>,
}

impl PositionLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得下一個節點的編號
    pub fn next(&mut self, level: usize) -> String {
        // 回到同層或較淺層：較深層的計數器已不適用
        if matches!(self.previous_level, Some(previous) if level <= previous) {
            self.counters.truncate(level + 1);
        }
        if self.counters.len() <= level {
            self.counters.resize(level + 1, 0);
        }
        self.counters[level] += 1;
        self.previous_level = Some(level);

        self.counters[..=level]
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// 依深度序列計算階層編號
pub fn labels_for_levels(levels: impl IntoIterator<Item = usize>) -> Vec<String> {
    let mut labeler = PositionLabeler::new();
    levels.into_iter().map(|level| labeler.next(level)).collect()
}

/// 依扁平樹的深度重新計算階層編號
pub fn position_labels(ordered_flat_tree: &[FlatTreeNode]) -> Vec<String> {
    labels_for_levels(ordered_flat_tree.iter().map(|f| f.level))
}
