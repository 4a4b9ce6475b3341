//! Two-surface synchronisation.
//!
//! ```text
//!  rich edit ──▶ project ──▶ plain.set_text(masked)      ┐
//!  plain edit ─▶ restore ──▶ rich.set_content(markup)    ├─▶ guard cleared ──▶ remote images
//!  paste / upload ─▶ project ──▶ both surfaces           ┘
//! ```
//!
//! Every programmatic surface update happens with the [`SyncGuard`] held. A
//! widget that fires its change signal from inside `set_*` re-enters the
//! controller, finds the guard set, and is ignored; this is what stops the two
//! surfaces from bouncing edits back and forth forever.
//!
//! The `handle_*` methods are the synchronous core and are what a toolkit
//! signal should call. The `on_*` methods wrap them and then run the remote
//! image pass, which only starts once the guard is clear.
//!
//! The controller is single-threaded (`!Sync`): it lives on the UI thread and
//! its futures are driven by that thread's executor.

use crate::cancel::CancelFlag;
use crate::document::Document;
use crate::error::DocPasteError;
use crate::output::PublishOutput;
use crate::pipeline::placeholder::{placeholder_spans, project, restore};
use crate::pipeline::remote::RemoteImageLoader;
use crate::publish::{find_inline_images, rewrite_markup, ImagePublisher};
use crate::surface::{ClipboardSink, ClipboardSource, PlainSurface, RichSurface};
use std::cell::{Cell, RefCell};
use tracing::{debug, info, warn};

/// Re-entrancy flag. The controller keeps one set while a surface is being
/// updated programmatically and another while an upload round runs.
#[derive(Debug, Default)]
pub struct SyncGuard(Cell<bool>);

impl SyncGuard {
    pub fn is_set(&self) -> bool {
        self.0.get()
    }

    /// Set the flag, or `None` when it already is. Dropping the token
    /// clears it.
    pub fn enter(&self) -> Option<GuardToken<'_>> {
        if self.0.replace(true) {
            return None;
        }
        Some(GuardToken(&self.0))
    }
}

/// Holds a [`SyncGuard`] set for as long as it lives.
#[must_use]
pub struct GuardToken<'a>(&'a Cell<bool>);

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// What a sync-triggering call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The other surface was recomputed.
    Propagated,
    /// A programmatic update was in flight; the call was ignored.
    Suppressed,
}

/// Mediates edits between a rich and a plain surface over one [`Document`].
pub struct SyncController<R: RichSurface, P: PlainSurface> {
    rich: R,
    plain: P,
    document: RefCell<Document>,
    guard: SyncGuard,
    upload: SyncGuard,
    loader: Option<RemoteImageLoader>,
}

impl<R: RichSurface, P: PlainSurface> SyncController<R, P> {
    /// Controller without remote image loading.
    pub fn new(rich: R, plain: P) -> Self {
        Self {
            rich,
            plain,
            document: RefCell::new(Document::default()),
            guard: SyncGuard::default(),
            upload: SyncGuard::default(),
            loader: None,
        }
    }

    pub fn with_remote_loader(mut self, loader: RemoteImageLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn rich(&self) -> &R {
        &self.rich
    }

    pub fn plain(&self) -> &P {
        &self.plain
    }

    /// Snapshot of the current document.
    pub fn document(&self) -> Document {
        self.document.borrow().clone()
    }

    pub fn canonical_markup(&self) -> String {
        self.document.borrow().canonical_markup().to_string()
    }

    /// True while a programmatic surface update is in flight.
    pub fn is_syncing(&self) -> bool {
        self.guard.is_set()
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.is_set()
    }

    // ── Synchronous core ──────────────────────────────────────────────────

    /// The rich surface changed: re-project and refresh the plain surface.
    pub fn handle_rich_edit(&self) -> SyncOutcome {
        let Some(_token) = self.guard.enter() else {
            debug!("Rich edit ignored: sync in progress");
            return SyncOutcome::Suppressed;
        };

        let projection = project(&self.rich.content());
        let masked = projection.masked_text.clone();
        self.document.borrow_mut().apply_projection(projection);

        self.plain.set_text(&masked);
        self.plain.highlight_placeholders(&placeholder_spans(&masked));
        SyncOutcome::Propagated
    }

    /// The plain surface changed: restore its text and refresh the rich
    /// surface. The image table is kept, so placeholders the user deleted or
    /// moved resolve against the same tags.
    pub fn handle_plain_edit(&self) -> SyncOutcome {
        let Some(_token) = self.guard.enter() else {
            debug!("Plain edit ignored: sync in progress");
            return SyncOutcome::Suppressed;
        };

        let text = self.plain.text();
        let restored = restore(&text, self.document.borrow().image_table());
        self.document
            .borrow_mut()
            .apply_plain_edit(text.clone(), restored.clone());

        self.rich.set_content(&restored);
        self.plain.highlight_placeholders(&placeholder_spans(&text));
        SyncOutcome::Propagated
    }

    /// Replace the whole document with `markup` and refresh both surfaces.
    pub fn handle_load(&self, markup: &str) -> SyncOutcome {
        let Some(_token) = self.guard.enter() else {
            debug!("Load ignored: sync in progress");
            return SyncOutcome::Suppressed;
        };

        let projection = project(markup);
        let canonical = projection.canonical_markup.clone();
        let masked = projection.masked_text.clone();
        self.document.borrow_mut().apply_projection(projection);

        self.rich.set_content(&canonical);
        self.plain.set_text(&masked);
        self.plain.highlight_placeholders(&placeholder_spans(&masked));
        SyncOutcome::Propagated
    }

    // ── Async entry points ────────────────────────────────────────────────

    pub async fn on_rich_edited(&self) -> SyncOutcome {
        self.then_load_remote(self.handle_rich_edit()).await
    }

    pub async fn on_plain_edited(&self) -> SyncOutcome {
        self.then_load_remote(self.handle_plain_edit()).await
    }

    pub async fn load_markup(&self, markup: &str) -> SyncOutcome {
        self.then_load_remote(self.handle_load(markup)).await
    }

    /// Load whatever the clipboard holds, preferring rich markup.
    ///
    /// Returns `false` when the clipboard was empty or a sync was in flight.
    pub async fn paste(&self, clipboard: &dyn ClipboardSource) -> bool {
        let Some(markup) = clipboard.read().into_markup() else {
            debug!("Paste ignored: clipboard is empty");
            return false;
        };
        info!("Pasting {} bytes", markup.len());
        self.load_markup(&markup).await == SyncOutcome::Propagated
    }

    async fn then_load_remote(&self, outcome: SyncOutcome) -> SyncOutcome {
        if outcome == SyncOutcome::Propagated {
            self.load_remote_images().await;
        }
        outcome
    }

    /// Fetch the rich surface's remote images and register them with it.
    ///
    /// Does nothing while the guard is set. Returns how many images were
    /// registered.
    pub async fn load_remote_images(&self) -> usize {
        let Some(loader) = self.loader.as_ref() else {
            return 0;
        };
        if self.guard.is_set() {
            debug!("Remote image pass skipped: sync in progress");
            return 0;
        }

        let fetched = loader.load(&self.rich.content()).await;
        if fetched.is_empty() {
            return 0;
        }

        let Some(_token) = self.guard.enter() else {
            return 0;
        };
        for image in &fetched {
            self.rich.add_image_resource(&image.url, &image.image);
        }
        debug!("Registered {} remote images", fetched.len());
        fetched.len()
    }

    // ── Upload ────────────────────────────────────────────────────────────

    /// Publish the inline images of the canonical markup and reload both
    /// surfaces from the rewritten markup.
    ///
    /// If the document was edited while the round ran, the uploaded URLs are
    /// applied to the current markup instead of the snapshot that was sent.
    ///
    /// # Errors
    /// [`DocPasteError::UploadInProgress`] when called during another round,
    /// or whatever session-fatal error the publisher returned. In both cases
    /// the document is untouched.
    pub async fn confirm_upload(
        &self,
        publisher: &ImagePublisher,
        cancel: &CancelFlag,
    ) -> Result<PublishOutput, DocPasteError> {
        let Some(_round) = self.upload.enter() else {
            return Err(DocPasteError::UploadInProgress);
        };
        let snapshot = self.canonical_markup();
        let mut output = publisher.publish(&snapshot, cancel).await?;
        if output.stats.succeeded == 0 {
            return Ok(output);
        }

        let current = self.canonical_markup();
        if current != snapshot {
            warn!("Document changed during upload; applying URLs to the current markup");
            let images = find_inline_images(&snapshot);
            let replacements: Vec<(&str, &str)> = output
                .images
                .iter()
                .filter_map(|r| {
                    let url = r.url.as_deref()?;
                    let uri = images.get(r.index.checked_sub(1)?)?.data_uri.as_str();
                    Some((uri, url))
                })
                .collect();
            output.markup = rewrite_markup(&current, &replacements);
        }

        self.load_markup(&output.markup).await;
        Ok(output)
    }

    // ── Copy ──────────────────────────────────────────────────────────────

    /// Put the canonical markup on the clipboard as text.
    pub fn copy_html(&self, sink: &dyn ClipboardSink) {
        sink.set_text(&self.canonical_markup());
    }

    /// Ask the rich surface to export the canonical markup as rich text.
    pub fn copy_rich_text(&self) {
        self.rich.copy_as_rich_text(&self.canonical_markup());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::oss::{OssTransport, UploadCredentials, UploadForm, UploadResponse};
    use crate::pipeline::remote::{FetchError, ImageFetcher};
    use crate::surface::ClipboardContent;
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::io::Cursor;
    use std::ops::Range;
    use std::rc::{Rc, Weak};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    // ── Surface doubles ───────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeRich {
        content: RefCell<String>,
        sets: Cell<usize>,
        resources: RefCell<Vec<String>>,
        exported: RefCell<Option<String>>,
        on_set: RefCell<Option<Box<dyn Fn()>>>,
    }

    impl RichSurface for FakeRich {
        fn set_content(&self, markup: &str) {
            *self.content.borrow_mut() = markup.to_string();
            self.sets.set(self.sets.get() + 1);
            if let Some(cb) = self.on_set.borrow().as_ref() {
                cb();
            }
        }

        fn content(&self) -> String {
            self.content.borrow().clone()
        }

        fn add_image_resource(&self, url: &str, _image: &DynamicImage) {
            self.resources.borrow_mut().push(url.to_string());
        }

        fn copy_as_rich_text(&self, markup: &str) {
            *self.exported.borrow_mut() = Some(markup.to_string());
        }
    }

    #[derive(Default)]
    struct FakePlain {
        text: RefCell<String>,
        sets: Cell<usize>,
        highlighted: RefCell<Vec<Range<usize>>>,
        on_set: RefCell<Option<Box<dyn Fn()>>>,
    }

    impl PlainSurface for FakePlain {
        fn set_text(&self, text: &str) {
            *self.text.borrow_mut() = text.to_string();
            self.sets.set(self.sets.get() + 1);
            if let Some(cb) = self.on_set.borrow().as_ref() {
                cb();
            }
        }

        fn text(&self) -> String {
            self.text.borrow().clone()
        }

        fn highlight_placeholders(&self, spans: &[Range<usize>]) {
            *self.highlighted.borrow_mut() = spans.to_vec();
        }
    }

    struct FakeClipboard(ClipboardContent);

    impl ClipboardSource for FakeClipboard {
        fn read(&self) -> ClipboardContent {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct FakeSink(RefCell<Option<String>>);

    impl ClipboardSink for FakeSink {
        fn set_text(&self, text: &str) {
            *self.0.borrow_mut() = Some(text.to_string());
        }
    }

    type Controller = SyncController<Rc<FakeRich>, Rc<FakePlain>>;

    fn controller() -> (Rc<Controller>, Rc<FakeRich>, Rc<FakePlain>) {
        let rich = Rc::new(FakeRich::default());
        let plain = Rc::new(FakePlain::default());
        let ctl = Rc::new(SyncController::new(Rc::clone(&rich), Rc::clone(&plain)));
        (ctl, rich, plain)
    }

    /// Make both fakes call back into the controller from inside `set_*`,
    /// the way a widget's change signal does. Returns the count of
    /// re-entrant calls that were suppressed.
    fn wire_reentrant_signals(
        ctl: &Rc<Controller>,
        rich: &FakeRich,
        plain: &FakePlain,
    ) -> Rc<Cell<usize>> {
        let suppressed = Rc::new(Cell::new(0));

        let weak: Weak<Controller> = Rc::downgrade(ctl);
        let count = Rc::clone(&suppressed);
        *rich.on_set.borrow_mut() = Some(Box::new(move || {
            if let Some(c) = weak.upgrade() {
                if c.handle_rich_edit() == SyncOutcome::Suppressed {
                    count.set(count.get() + 1);
                }
            }
        }));

        let weak: Weak<Controller> = Rc::downgrade(ctl);
        let count = Rc::clone(&suppressed);
        *plain.on_set.borrow_mut() = Some(Box::new(move || {
            if let Some(c) = weak.upgrade() {
                if c.handle_plain_edit() == SyncOutcome::Suppressed {
                    count.set(count.get() + 1);
                }
            }
        }));

        suppressed
    }

    const PNG_A: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    // ── Guard ─────────────────────────────────────────────────────────────

    #[test]
    fn guard_token_clears_on_drop() {
        let guard = SyncGuard::default();
        {
            let _t = guard.enter().unwrap();
            assert!(guard.is_set());
            assert!(guard.enter().is_none());
        }
        assert!(!guard.is_set());
    }

    // ── Edits ─────────────────────────────────────────────────────────────

    #[test]
    fn rich_edit_refreshes_plain_surface() {
        let (ctl, rich, plain) = controller();
        *rich.content.borrow_mut() = format!(r#"<p>hi</p><img src="{PNG_A}">"#);

        assert_eq!(ctl.handle_rich_edit(), SyncOutcome::Propagated);
        assert_eq!(plain.text(), "<p>hi</p>\n[Image omitted #1]\n");
        assert_eq!(ctl.document().image_table().len(), 1);
        assert_eq!(plain.highlighted.borrow().len(), 1);
        assert!(!ctl.is_syncing());
    }

    #[test]
    fn plain_edit_restores_into_rich_surface() {
        let (ctl, rich, plain) = controller();
        ctl.handle_load(&format!(r#"<p>hi</p><img src="{PNG_A}">"#));

        *plain.text.borrow_mut() = "<p>hello</p>\n[Image omitted #1]\n".into();
        assert_eq!(ctl.handle_plain_edit(), SyncOutcome::Propagated);

        let expected = format!(r#"<p>hello</p><img src="{PNG_A}">"#);
        assert_eq!(rich.content(), expected);
        assert_eq!(ctl.canonical_markup(), expected);
        assert_eq!(ctl.document().masked_text(), "<p>hello</p>\n[Image omitted #1]\n");
    }

    #[test]
    fn reentrant_signals_are_suppressed() {
        let (ctl, rich, plain) = controller();
        let suppressed = wire_reentrant_signals(&ctl, &rich, &plain);

        *rich.content.borrow_mut() = format!(r#"<img src="{PNG_A}">"#);
        assert_eq!(ctl.handle_rich_edit(), SyncOutcome::Propagated);
        assert_eq!(suppressed.get(), 1);
        assert_eq!(plain.sets.get(), 1);
        assert_eq!(rich.sets.get(), 0);

        *plain.text.borrow_mut() = "x\n[Image omitted #1]\n".into();
        assert_eq!(ctl.handle_plain_edit(), SyncOutcome::Propagated);
        assert_eq!(suppressed.get(), 2);
        assert_eq!(rich.sets.get(), 1);
        assert_eq!(plain.sets.get(), 1);
        assert!(!ctl.is_syncing());
    }

    #[test]
    fn stale_placeholder_is_dropped_on_plain_edit() {
        // Known sharp edge: a number beyond the table vanishes silently.
        let (ctl, rich, plain) = controller();
        ctl.handle_load(&format!(r#"<img src="{PNG_A}">"#));

        *plain.text.borrow_mut() = "a\n[Image omitted #5]\nb".into();
        ctl.handle_plain_edit();
        assert_eq!(rich.content(), "ab");
    }

    #[test]
    fn load_fills_both_surfaces() {
        let (ctl, rich, plain) = controller();
        let outcome = tokio_test::block_on(ctl.load_markup("<p>plain</p>"));
        assert_eq!(outcome, SyncOutcome::Propagated);
        assert_eq!(rich.content(), "<p>plain</p>");
        assert_eq!(plain.text(), "<p>plain</p>");
        assert!(plain.highlighted.borrow().is_empty());
    }

    // ── Paste and copy ────────────────────────────────────────────────────

    #[tokio::test]
    async fn paste_prefers_markup_and_ignores_empty_clipboard() {
        let (ctl, rich, plain) = controller();

        assert!(!ctl.paste(&FakeClipboard(ClipboardContent::Empty)).await);
        assert_eq!(rich.sets.get(), 0);

        let html = format!(r#"<b>x</b><img src="{PNG_A}">"#);
        assert!(ctl.paste(&FakeClipboard(ClipboardContent::Html(html.clone()))).await);
        assert_eq!(rich.content(), html);
        assert_eq!(plain.text(), "<b>x</b>\n[Image omitted #1]\n");
    }

    #[test]
    fn copy_exports_canonical_markup() {
        let (ctl, rich, _plain) = controller();
        ctl.handle_load("<p>c</p>");

        let sink = FakeSink::default();
        ctl.copy_html(&sink);
        assert_eq!(sink.0.borrow().as_deref(), Some("<p>c</p>"));

        ctl.copy_rich_text();
        assert_eq!(rich.exported.borrow().as_deref(), Some("<p>c</p>"));
    }

    // ── Remote images ─────────────────────────────────────────────────────

    struct TinyPngFetcher(AtomicUsize);

    #[async_trait]
    impl ImageFetcher for TinyPngFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if url.contains("missing") {
                return Err(FetchError::Status { status: 404 });
            }
            let mut buf = Cursor::new(Vec::new());
            DynamicImage::new_rgb8(2, 2)
                .write_to(&mut buf, image::ImageFormat::Png)
                .unwrap();
            Ok(buf.into_inner())
        }
    }

    #[tokio::test]
    async fn remote_images_are_registered_after_sync() {
        let rich = Rc::new(FakeRich::default());
        let plain = Rc::new(FakePlain::default());
        let fetcher = Arc::new(TinyPngFetcher(AtomicUsize::new(0)));
        let loader = RemoteImageLoader::with_fetcher(fetcher.clone(), 2);
        let ctl = SyncController::new(Rc::clone(&rich), Rc::clone(&plain))
            .with_remote_loader(loader);

        ctl.load_markup(
            r#"<img src="https://cdn.test/a.png"><img src="https://cdn.test/missing.png">"#,
        )
        .await;

        assert_eq!(fetcher.0.load(Ordering::SeqCst), 2);
        assert_eq!(*rich.resources.borrow(), vec!["https://cdn.test/a.png"]);
        assert!(!ctl.is_syncing());
    }

    // ── Upload ────────────────────────────────────────────────────────────

    struct AcceptAll {
        posts: AtomicUsize,
    }

    #[async_trait]
    impl OssTransport for AcceptAll {
        async fn fetch_credentials(&self, _url: &str) -> Result<UploadCredentials, DocPasteError> {
            Ok(UploadCredentials {
                access_key_id: "id".into(),
                access_key_secret: "secret".into(),
                security_token: "token".into(),
                expires_at_epoch_secs: None,
            })
        }

        async fn post_form(&self, _url: &str, _form: UploadForm) -> Result<UploadResponse, String> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            Ok(UploadResponse {
                status: 200,
                body: String::new(),
            })
        }
    }

    fn test_config() -> UploadConfig {
        UploadConfig::builder()
            .credentials_url("https://sts.test/token")
            .upload_url("https://bucket.test")
            .public_base_url("https://cdn.test")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn confirm_upload_reloads_surfaces_with_urls() {
        let (ctl, rich, plain) = controller();
        ctl.handle_load(&format!(r#"<p>a</p><img src="{PNG_A}">"#));

        let transport = Arc::new(AcceptAll {
            posts: AtomicUsize::new(0),
        });
        let publisher = ImagePublisher::with_transport(test_config(), transport.clone());
        let out = ctl
            .confirm_upload(&publisher, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(out.summary(), (1, 1));
        assert_eq!(transport.posts.load(Ordering::SeqCst), 1);
        assert!(rich.content().contains(r#"src="https://cdn.test/images/"#));
        assert!(!rich.content().contains("data:"));
        assert_eq!(plain.text(), "<p>a</p>\n[Image omitted #1]\n");
        assert!(!ctl.is_uploading());
    }

    /// Holds each POST open until the test releases it.
    #[derive(Default)]
    struct GatedTransport {
        posts: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl OssTransport for GatedTransport {
        async fn fetch_credentials(&self, _url: &str) -> Result<UploadCredentials, DocPasteError> {
            Ok(UploadCredentials {
                access_key_id: "id".into(),
                access_key_secret: "secret".into(),
                security_token: "token".into(),
                expires_at_epoch_secs: None,
            })
        }

        async fn post_form(&self, _url: &str, _form: UploadForm) -> Result<UploadResponse, String> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(UploadResponse {
                status: 200,
                body: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn edit_during_upload_receives_the_urls() {
        let (ctl, rich, plain) = controller();
        ctl.handle_load(&format!(r#"<p>a</p><img src="{PNG_A}">"#));

        let transport = Arc::new(GatedTransport::default());
        let publisher = ImagePublisher::with_transport(test_config(), transport.clone());
        let cancel = CancelFlag::new();

        let edit = async {
            transport.entered.notified().await;
            *plain.text.borrow_mut() = "<p>edited</p>\n[Image omitted #1]\n".into();
            assert_eq!(ctl.handle_plain_edit(), SyncOutcome::Propagated);
            transport.release.notify_one();
        };
        let (out, ()) = tokio::join!(ctl.confirm_upload(&publisher, &cancel), edit);
        let out = out.unwrap();

        let url = out.images[0].url.as_deref().unwrap();
        let expected = format!(r#"<p>edited</p><img src="{url}">"#);
        assert_eq!(out.markup, expected);
        assert_eq!(rich.content(), expected);
        assert_eq!(ctl.canonical_markup(), expected);
        assert_eq!(plain.text(), "<p>edited</p>\n[Image omitted #1]\n");
    }

    #[tokio::test]
    async fn second_confirm_during_upload_is_refused() {
        let (ctl, _rich, _plain) = controller();
        ctl.handle_load(&format!(r#"<img src="{PNG_A}">"#));

        let transport = Arc::new(GatedTransport::default());
        let publisher = ImagePublisher::with_transport(test_config(), transport.clone());
        let cancel = CancelFlag::new();

        let second = async {
            transport.entered.notified().await;
            assert!(ctl.is_uploading());
            let result = ctl.confirm_upload(&publisher, &cancel).await;
            transport.release.notify_one();
            result
        };
        let (first, second) = tokio::join!(ctl.confirm_upload(&publisher, &cancel), second);

        assert!(matches!(second, Err(DocPasteError::UploadInProgress)));
        assert_eq!(first.unwrap().summary(), (1, 1));
        assert_eq!(transport.posts.load(Ordering::SeqCst), 1);
        assert!(!ctl.is_uploading());
    }

    #[tokio::test]
    async fn confirm_upload_with_missing_config_leaves_document() {
        let (ctl, rich, _plain) = controller();
        let markup = format!(r#"<img src="{PNG_A}">"#);
        ctl.handle_load(&markup);

        let publisher = ImagePublisher::with_transport(
            UploadConfig::default(),
            Arc::new(AcceptAll {
                posts: AtomicUsize::new(0),
            }),
        );
        let err = ctl
            .confirm_upload(&publisher, &CancelFlag::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DocPasteError::MissingEndpoint { .. }));
        assert_eq!(rich.content(), markup);
        assert_eq!(ctl.canonical_markup(), markup);
        assert!(!ctl.is_uploading());
    }
}
