//! Media library collaborator.
//!
//! The pipeline only needs to list collections and their tracks. Anything that
//! can do that implements [`MediaLibrary`]; the shipped implementation reads a
//! JSON manifest ([`ManifestLibrary`]).

mod manifest;

pub use manifest::ManifestLibrary;

use mixburn_common::{Result, TrackDescriptor};

/// Source of collections and their tracks.
pub trait MediaLibrary: Send + Sync {
    /// Names of every collection, in library order.
    fn collection_names(&self) -> Result<Vec<String>>;

    /// Tracks of the collection named exactly `name`, or `None` if there is
    /// no such collection.
    fn tracks(&self, name: &str) -> Result<Option<Vec<TrackDescriptor>>>;

    /// Library spelling of `name`, matched case-insensitively.
    fn find_collection(&self, name: &str) -> Result<Option<String>> {
        let wanted = name.to_lowercase();
        Ok(self
            .collection_names()?
            .into_iter()
            .find(|n| n.to_lowercase() == wanted))
    }
}
