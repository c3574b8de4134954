pub mod books;

use std::sync::Arc;

use shelf_kernel::{settings::Settings, ModuleRegistry};

use books::store::BookStore;

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    book_store: Arc<dyn BookStore>,
) -> anyhow::Result<()> {
    registry.register(books::create_module(book_store, &settings.books))?;
    Ok(())
}
