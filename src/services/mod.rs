//! Service layer: the external collaborators the pipeline consumes.
//!
//! - Remote article feed (`ArticleSource`, `NewsApiClient`)
//! - Thumbnail download (`ImageFetcher`, `HttpImageFetcher`)
//! - Reachability probe (`Connectivity`, `TcpProbe`)

pub mod connectivity;
pub mod images;
pub mod news;

pub use connectivity::{Connectivity, TcpProbe};
pub use images::{HttpImageFetcher, ImageFetcher};
pub use news::{ArticleSource, FetchError, NewsApiClient};
