use lexblocks_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
