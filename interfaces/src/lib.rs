pub mod defs;

pub use defs::{
    AdCategory, Advertisement, Area, Article, NewAdvertisement, NewArticle, NewPost, PageView,
    Post,
};
