// Upload form: reads four values from a field source and hands them to an
// injected uploader, then logs whatever comes back.
//
// The form knows nothing about terminals or HTTP. Anything that can answer
// the four getters in `FormFields` can drive it, and anything implementing
// `Uploader` (the Hub client, a closure, a test double) can receive the call.

use crate::files::FileSelection;
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, error, info};

/// Typed access to the current value of each form field.
pub trait FormFields {
    fn username(&self) -> String;
    fn repository(&self) -> String;
    fn write_key(&self) -> String;
    fn files(&self) -> FileSelection;
}

/// Owned snapshot of the four fields.
#[derive(Clone, Debug, Default)]
pub struct FormValues {
    pub username: String,
    pub repository: String,
    pub write_key: String,
    pub files: FileSelection,
}

impl FormFields for FormValues {
    fn username(&self) -> String {
        self.username.clone()
    }

    fn repository(&self) -> String {
        self.repository.clone()
    }

    fn write_key(&self) -> String {
        self.write_key.clone()
    }

    fn files(&self) -> FileSelection {
        self.files.clone()
    }
}

/// The asynchronous upload operation the form forwards to.
pub trait Uploader {
    type Output: Display;
    type Error: Display;

    fn upload(
        &self,
        username: String,
        repository: String,
        write_key: String,
        files: FileSelection,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Adapter turning an async function into an [`Uploader`].
#[derive(Clone)]
pub struct UploadFn<F>(F);

/// Wrap `f` so it can be injected into an [`UploadForm`].
pub fn from_fn<F, Fut, T, E>(f: F) -> UploadFn<F>
where
    F: Fn(String, String, String, FileSelection) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Display,
    E: Display,
{
    UploadFn(f)
}

impl<F, Fut, T, E> Uploader for UploadFn<F>
where
    F: Fn(String, String, String, FileSelection) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Display,
    E: Display,
{
    type Output = T;
    type Error = E;

    fn upload(
        &self,
        username: String,
        repository: String,
        write_key: String,
        files: FileSelection,
    ) -> impl Future<Output = Result<T, E>> + Send {
        (self.0)(username, repository, write_key, files)
    }
}

/// The form itself. Holds nothing but its uploader, so every submission is
/// independent of the ones before it.
pub struct UploadForm<U> {
    uploader: U,
}

impl<U: Uploader> UploadForm<U> {
    pub fn new(uploader: U) -> Self {
        UploadForm { uploader }
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Read the fields as they are right now and run one upload.
    ///
    /// Values are passed through untouched, empty ones included. The result
    /// is only logged. Overlapping calls are not guarded against: each one
    /// issues its own upload.
    pub async fn submit<F>(&self, fields: &F)
    where
        F: FormFields + ?Sized,
    {
        let username = fields.username();
        let repository = fields.repository();
        let write_key = fields.write_key();
        let files = fields.files();

        debug!(%username, %repository, files = files.len(), "submitting upload");

        match self.uploader.upload(username, repository, write_key, files).await {
            Ok(response) => info!("{}", response),
            Err(err) => error!("{}", err),
        }
    }
}
