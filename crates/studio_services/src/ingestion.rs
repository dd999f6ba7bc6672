use core_types::{
    ExtractionResult, FileUpload, KnowledgeBaseId, KnowledgeItem, KnowledgeItemKind,
    KnowledgeItemPatch, KnowledgeItemStatus, ToastVariant,
};
use tracing::{error, info, warn};

use crate::context::StudioContext;
use crate::error::{ServiceError, ServiceResult, ValidationError};
use crate::knowledge_items::{KnowledgeItemService, NewKnowledgeItem};

pub const URL_PLACEHOLDER_TITLE: &str = "Processing...";

/// Toast keys and fallbacks that differ between the PDF and URL pipelines.
struct Pipeline {
    source: &'static str,
    added_title: &'static str,
    added_desc: &'static str,
    processed_title: &'static str,
    failed_key: &'static str,
    extract_fallback: &'static str,
}

const PDF: Pipeline = Pipeline {
    source: "pdf",
    added_title: "items.pdf_uploaded.title",
    added_desc: "items.pdf_uploaded.desc",
    processed_title: "items.pdf_processed.title",
    failed_key: "items.pdf_failed",
    extract_fallback: "Failed to extract PDF content",
};

const URL: Pipeline = Pipeline {
    source: "url",
    added_title: "items.url_added.title",
    added_desc: "items.url_added.desc",
    processed_title: "items.url_processed.title",
    failed_key: "items.url_failed",
    extract_fallback: "Failed to extract URL content",
};

/// Turns uploads into stored knowledge items:
/// placeholder row in `processing`, extraction, then `completed`.
#[derive(Clone)]
pub struct IngestionService {
    ctx: StudioContext,
    items: KnowledgeItemService,
}

impl IngestionService {
    pub fn new(ctx: StudioContext) -> Self {
        let items = KnowledgeItemService::new(ctx.clone());
        Self { ctx, items }
    }

    pub async fn add_pdf(
        &self,
        knowledge_base_id: Option<KnowledgeBaseId>,
        file: FileUpload,
    ) -> ServiceResult<KnowledgeItem> {
        let knowledge_base_id = self.require_base(knowledge_base_id)?;
        if !file.is_pdf() {
            self.ctx.toaster.show(
                ToastVariant::Destructive,
                "items.invalid_type.title",
                "items.invalid_type.desc",
            );
            return Err(ValidationError::NotPdf(file.content_type).into());
        }

        info!(file_name = %file.file_name, bytes = file.size(), "starting pdf ingestion");
        let placeholder = NewKnowledgeItem {
            knowledge_base_id,
            kind: KnowledgeItemKind::Pdf,
            title: file.file_name.clone(),
            content: None,
            status: KnowledgeItemStatus::Processing,
            url: None,
            file_name: Some(file.file_name.clone()),
        };
        let item = self.create_placeholder(&PDF, placeholder).await?;
        let extracted = self.ctx.extractor().extract_pdf(&file).await;
        self.finish(&PDF, item, extracted).await
    }

    pub async fn add_url(
        &self,
        knowledge_base_id: Option<KnowledgeBaseId>,
        url: &str,
    ) -> ServiceResult<KnowledgeItem> {
        let knowledge_base_id = self.require_base(knowledge_base_id)?;
        let url = url.trim();
        if url.is_empty() {
            return Err(self.ctx.fail("items.empty_url", ValidationError::EmptyUrl.into()));
        }

        info!(url, "starting url ingestion");
        let placeholder = NewKnowledgeItem {
            knowledge_base_id,
            kind: KnowledgeItemKind::Url,
            title: URL_PLACEHOLDER_TITLE.to_owned(),
            content: None,
            status: KnowledgeItemStatus::Processing,
            url: Some(url.to_owned()),
            file_name: None,
        };
        let item = self.create_placeholder(&URL, placeholder).await?;
        let extracted = self.ctx.extractor().extract_url(url).await;
        self.finish(&URL, item, extracted).await
    }

    /// Text goes straight to `completed`; the extractor is never called.
    pub async fn add_text(
        &self,
        knowledge_base_id: Option<KnowledgeBaseId>,
        title: &str,
        content: &str,
    ) -> ServiceResult<KnowledgeItem> {
        let knowledge_base_id = self.require_base(knowledge_base_id)?;
        let (title, content) = (title.trim(), content.trim());
        if title.is_empty() || content.is_empty() {
            return Err(self.ctx.fail("items.empty_text", ValidationError::EmptyText.into()));
        }

        let created = self
            .items
            .create(NewKnowledgeItem {
                knowledge_base_id,
                kind: KnowledgeItemKind::Text,
                title: title.to_owned(),
                content: Some(content.to_owned()),
                status: KnowledgeItemStatus::Completed,
                url: None,
                file_name: None,
            })
            .await;
        match created {
            Ok(item) => {
                self.ctx.toaster.show(
                    ToastVariant::Default,
                    "items.text_added.title",
                    "items.text_added.desc",
                );
                Ok(item)
            }
            Err(err) => {
                error!(error = %err, "failed to add text item");
                Err(self.ctx.report("items.text_failed", err))
            }
        }
    }

    fn require_base(&self, knowledge_base_id: Option<KnowledgeBaseId>) -> ServiceResult<KnowledgeBaseId> {
        knowledge_base_id.ok_or_else(|| {
            self.ctx.toaster.show(
                ToastVariant::Destructive,
                "items.no_base.title",
                "items.no_base.desc",
            );
            ValidationError::NoKnowledgeBase.into()
        })
    }

    async fn create_placeholder(
        &self,
        pipeline: &Pipeline,
        placeholder: NewKnowledgeItem,
    ) -> ServiceResult<KnowledgeItem> {
        match self.items.create(placeholder).await {
            Ok(item) => {
                self.ctx.toaster.show(
                    ToastVariant::Default,
                    pipeline.added_title,
                    pipeline.added_desc,
                );
                Ok(item)
            }
            Err(err) => {
                error!(source = pipeline.source, error = %err, "failed to create placeholder item");
                let message = describe(&err, &self.ctx.toaster.t(pipeline.failed_key));
                self.ctx
                    .toaster
                    .emit(ToastVariant::Destructive, "items.processing_failed", message);
                Err(err)
            }
        }
    }

    async fn finish(
        &self,
        pipeline: &Pipeline,
        item: KnowledgeItem,
        extracted: anyhow::Result<ExtractionResult>,
    ) -> ServiceResult<KnowledgeItem> {
        let result = match extracted {
            Ok(result) if result.success => result,
            Ok(result) => {
                let message = result
                    .error
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| pipeline.extract_fallback.to_owned());
                return Err(self.extraction_failed(pipeline, &item, message).await);
            }
            Err(err) => {
                return Err(self.extraction_failed(pipeline, &item, err.to_string()).await);
            }
        };

        let title = if result.title.trim().is_empty() {
            item.url.clone().unwrap_or_else(|| item.title.clone())
        } else {
            result.title
        };
        match self
            .items
            .update(item.id, KnowledgeItemPatch::completed(title, result.content))
            .await
        {
            Ok(completed) => {
                info!(item_id = %completed.id, source = pipeline.source, "knowledge item completed");
                self.ctx.toaster.show(
                    ToastVariant::Default,
                    pipeline.processed_title,
                    "items.processed.desc",
                );
                Ok(completed)
            }
            Err(err) => {
                warn!(item_id = %item.id, error = %err, "extracted content could not be saved");
                self.ctx.toaster.emit(
                    ToastVariant::Warning,
                    "items.processing_failed",
                    describe(&err, &self.ctx.toaster.t(pipeline.failed_key)),
                );
                Err(err)
            }
        }
    }

    /// Reports the failure. The row stays in `processing` unless failed items
    /// are configured to be marked.
    async fn extraction_failed(
        &self,
        pipeline: &Pipeline,
        item: &KnowledgeItem,
        message: String,
    ) -> ServiceError {
        error!(item_id = %item.id, source = pipeline.source, error = %message, "extraction failed");
        self.ctx.toaster.emit(
            ToastVariant::Destructive,
            "items.processing_failed",
            message.clone(),
        );
        if self.ctx.settings.mark_failed_items
            && let Err(err) = self.items.update(item.id, KnowledgeItemPatch::failed()).await
        {
            warn!(item_id = %item.id, error = %err, "could not mark item as failed");
        }
        ServiceError::Extraction(message)
    }
}

fn describe(err: &ServiceError, fallback: &str) -> String {
    let message = err.user_message();
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}
