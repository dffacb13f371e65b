use crate::prelude::*;

use crate::base::record::BlobRef;
use crate::blobs::{BlobStore, check_key};
use crate::settings::S3BlobSpec;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

const S3_SCHEME: &str = "s3://";

/// Stores blobs in an S3 bucket, or any S3-compatible service when an
/// endpoint is configured.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, prefix: Option<String>) -> Self {
        let prefix = prefix
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        Self {
            client,
            bucket,
            prefix,
        }
    }

    /// Build a client from the ambient AWS configuration plus `spec`.
    pub async fn connect(spec: &S3BlobSpec) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &spec.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &spec.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());
        info!(bucket = %spec.bucket, endpoint = ?spec.endpoint, "s3 blob store configured");
        Ok(Self::new(client, spec.bucket.clone(), spec.prefix.clone()))
    }

    fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }

    fn blob_ref(&self, object_key: &str) -> BlobRef {
        BlobRef(format!("{S3_SCHEME}{}/{object_key}", self.bucket))
    }

    fn parse_ref<'a>(&self, blob_ref: &'a BlobRef) -> Result<&'a str> {
        let (bucket, object_key) = blob_ref
            .as_str()
            .strip_prefix(S3_SCHEME)
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(|| Error::blob(format!("not an s3 blob reference: {blob_ref}")))?;
        if bucket != self.bucket {
            return Err(Error::blob(format!(
                "blob reference points at bucket `{bucket}`, store uses `{}`",
                self.bucket
            )));
        }
        Ok(object_key)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<BlobRef> {
        check_key(key)?;
        let object_key = self.object_key(key);
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(data))
            .set_content_type(content_type.map(str::to_owned))
            .send()
            .await
            .map_err(|e| Error::blob(DisplayErrorContext(e).to_string()))?;
        debug!(bucket = %self.bucket, key = %object_key, size, "blob uploaded");
        Ok(self.blob_ref(&object_key))
    }

    async fn get(&self, blob_ref: &BlobRef) -> Result<Bytes> {
        let object_key = self.parse_ref(blob_ref)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| Error::blob(DisplayErrorContext(e).to_string()))?;
        let data = output.body.collect().await.map_err(Error::blob)?;
        Ok(data.into_bytes())
    }
}
