pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{info, section, success, warn};
pub use table::{columns_table, embeddings_table, ColumnRow, EmbeddingRow};
pub use theme::{theme, Theme};
