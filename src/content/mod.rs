pub mod article;
pub mod layout;
pub mod vocabulary;

pub use article::{load_articles, AgeRange, Article};
pub use layout::{layout_article, FontSize, LayoutConfig};
pub use vocabulary::Vocabulary;
