use anyhow::anyhow;
use chrono::Utc;
use core_types::{FileUpload, ObjectStorage};
use rand::Rng;
use tracing::{error, info};
use url::Url;

use crate::context::StudioContext;
use crate::error::{ServiceError, ServiceResult, ValidationError};

pub const AVATAR_FOLDER: &str = "agent-avatars";
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Clone)]
pub struct AvatarService {
    ctx: StudioContext,
}

impl AvatarService {
    pub fn new(ctx: StudioContext) -> Self {
        Self { ctx }
    }

    fn storage(&self) -> &dyn ObjectStorage {
        self.ctx.clients.storage.as_ref()
    }

    /// Stores the image under a fresh name and returns its public URL.
    pub async fn upload(&self, file: FileUpload) -> ServiceResult<String> {
        if !file.is_image() {
            return Err(self.ctx.fail(
                "avatar.not_image",
                ValidationError::NotImage(file.content_type).into(),
            ));
        }
        if file.size() > MAX_AVATAR_BYTES {
            return Err(self.ctx.fail(
                "avatar.too_large",
                ValidationError::TooLarge {
                    size: file.size(),
                    limit: MAX_AVATAR_BYTES,
                }
                .into(),
            ));
        }

        let bucket = &self.ctx.settings.avatar_bucket;
        let path = avatar_path(file.extension());
        if let Err(err) = self.storage().upload(bucket, &path, &file).await {
            error!(bucket = %bucket, path = %path, error = %err, "avatar upload failed");
            return Err(self
                .ctx
                .fail("avatar.upload_failed", ServiceError::remote("upload avatar")(err)));
        }

        info!(path = %path, "avatar uploaded");
        self.ctx.toaster.success("avatar.uploaded");
        Ok(self.storage().public_url(bucket, &path))
    }

    /// Deletes the object behind a public URL built by [`AvatarService::upload`].
    pub async fn remove(&self, public_url: &str) -> ServiceResult<()> {
        let removed = async {
            let path = object_path(public_url)?;
            self.storage()
                .remove(&self.ctx.settings.avatar_bucket, &[path.clone()])
                .await?;
            anyhow::Ok(path)
        }
        .await;

        match removed {
            Ok(path) => {
                info!(path = %path, "avatar removed");
                self.ctx.toaster.success("avatar.removed");
                Ok(())
            }
            Err(err) => {
                error!(url = public_url, error = %err, "avatar removal failed");
                Err(self
                    .ctx
                    .fail("avatar.remove_failed", ServiceError::remote("remove avatar")(err)))
            }
        }
    }
}

/// `agent-avatars/<epoch millis>-<random base36>.<ext>`
pub fn avatar_path(extension: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..11)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "{AVATAR_FOLDER}/{}-{suffix}.{extension}",
        Utc::now().timestamp_millis()
    )
}

/// Last two path segments of a public object URL, i.e. `<folder>/<file>`.
pub fn object_path(public_url: &str) -> anyhow::Result<String> {
    let url = Url::parse(public_url)?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [.., folder, file] => Ok(format!("{folder}/{file}")),
        _ => Err(anyhow!("cannot derive object path from {public_url}")),
    }
}
