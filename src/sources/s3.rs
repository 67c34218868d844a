//! Listing the objects of a Zarr stored in an S3-compatible object store.
//!
//! Each object's ETag is used as its file digest; object contents are never
//! downloaded.
use crate::checksum::{ZarrChecksumTree, ZarrDirectoryDigest};
use crate::errors::{ChecksumError, S3Error};
use crate::zarr::{EntryPath, ZarrArchiveFile};
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info, warn};
use percent_encoding::percent_decode_str;
use reqwest::Client;
use rusty_s3::{Bucket, Credentials, S3Action, UrlStyle};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Lifetime of the signature on each presigned listing URL
const SIGNATURE_TTL: Duration = Duration::from_secs(15 * 60);

/// A parsed `s3://bucket/prefix` URL
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct S3Url {
    bucket: String,
    prefix: String,
}

impl S3Url {
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The key prefix of the Zarr, without leading or trailing slashes.  This
    /// is empty if the Zarr is the whole bucket.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The prefix passed to the listing request.  A trailing slash is added
    /// so that keys of sibling objects like `prefix2/foo` are not matched.
    fn listing_prefix(&self) -> String {
        if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        }
    }
}

impl FromStr for S3Url {
    type Err = S3Error;

    fn from_str(s: &str) -> Result<S3Url, S3Error> {
        let invalid = |reason| S3Error::InvalidUrl {
            url: s.to_owned(),
            reason,
        };
        let Some(rest) = s.strip_prefix("s3://") else {
            return Err(invalid("URL scheme must be s3"));
        };
        let (bucket, path) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid("bucket name is empty"));
        }
        Ok(S3Url {
            bucket: bucket.to_owned(),
            prefix: path.trim_matches('/').to_owned(),
        })
    }
}

impl fmt::Display for S3Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

/// Options for connecting to an S3-compatible object store
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct S3Options {
    /// Base URL of an S3-compatible service (e.g., MinIO).  Buckets are then
    /// addressed path-style.  If `None`, AWS's virtual-hosted endpoint for
    /// `region` is used.
    pub endpoint_url: Option<String>,
    pub region: String,
    /// Timeout for each listing request
    pub timeout: Duration,
    /// Credentials for signing requests.  If `None`, requests are sent
    /// anonymously, which only works for public buckets.
    pub credentials: Option<S3Credentials>,
}

impl Default for S3Options {
    fn default() -> S3Options {
        S3Options {
            endpoint_url: None,
            region: String::from(DEFAULT_REGION),
            timeout: DEFAULT_TIMEOUT,
            credentials: None,
        }
    }
}

/// AWS access credentials, used to sign listing requests with Signature
/// Version 4
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Session token for temporary credentials
    pub session_token: Option<String>,
}

impl S3Credentials {
    fn to_signing_credentials(&self) -> Credentials {
        match &self.session_token {
            Some(token) => Credentials::new_with_token(
                self.access_key_id.clone(),
                self.secret_access_key.clone(),
                token.clone(),
            ),
            None => Credentials::new(self.access_key_id.clone(), self.secret_access_key.clone()),
        }
    }
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// An object as reported by a ListObjectsV2 request.  `key` is always
/// decoded, even if the response used URL encoding.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ListedObject {
    pub key: String,
    pub size: u64,
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// One page of results from a ListObjectsV2 request
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ListPage {
    pub objects: Vec<ListedObject>,
    /// Token for fetching the next page; `None` on the last page
    pub next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListedObject>,
    #[serde(default)]
    next_continuation_token: Option<String>,
    #[serde(default)]
    encoding_type: Option<String>,
}

/// A source of ListObjectsV2 result pages
#[async_trait]
pub trait ObjectLister: Send + Sync {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage, S3Error>;
}

/// An [`ObjectLister`] that makes ListObjectsV2 requests over HTTP.  Requests
/// are presigned if credentials were supplied and anonymous otherwise.
#[derive(Clone, Debug)]
pub struct HttpLister {
    client: Client,
    endpoint: Url,
    path_style: bool,
    region: String,
    credentials: Option<S3Credentials>,
}

impl HttpLister {
    pub fn new(options: S3Options) -> Result<HttpLister, S3Error> {
        let (endpoint, path_style) = match options.endpoint_url {
            Some(url) => (parse_endpoint(url)?, true),
            None => (
                parse_endpoint(format!("https://s3.{}.amazonaws.com", options.region))?,
                false,
            ),
        };
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(options.timeout)
            .build()
            .map_err(S3Error::Client)?;
        Ok(HttpLister {
            client,
            endpoint,
            path_style,
            region: options.region,
            credentials: options.credentials,
        })
    }

    /// Construct the (possibly presigned) URL for fetching one page of a
    /// listing
    fn list_url(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<Url, S3Error> {
        let style = if self.path_style {
            UrlStyle::Path
        } else {
            UrlStyle::VirtualHost
        };
        let b = Bucket::new(
            self.endpoint.clone(),
            style,
            bucket.to_owned(),
            self.region.clone(),
        )
        .map_err(|e| S3Error::InvalidBucket {
            bucket: bucket.to_owned(),
            reason: e.to_string(),
        })?;
        let credentials = self
            .credentials
            .as_ref()
            .map(S3Credentials::to_signing_credentials);
        let mut action = b.list_objects_v2(credentials.as_ref());
        action.with_prefix(prefix);
        if let Some(token) = continuation_token {
            action.with_continuation_token(token);
        }
        Ok(action.sign(SIGNATURE_TTL))
    }
}

fn parse_endpoint(url: String) -> Result<Url, S3Error> {
    match Url::parse(&url) {
        Ok(u) => Ok(u),
        Err(source) => Err(S3Error::InvalidEndpoint { url, source }),
    }
}

#[async_trait]
impl ObjectLister for HttpLister {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage, S3Error> {
        let request_error = |source| S3Error::Request {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
            source,
        };
        let url = self.list_url(bucket, prefix, continuation_token)?;
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request_error)?
            .bytes()
            .await
            .map_err(request_error)?;
        parse_listing(bucket, &body)
    }
}

/// Parse the XML body of a ListObjectsV2 response, decoding the object keys
/// if the response says they are URL-encoded
pub fn parse_listing(bucket: &str, body: &Bytes) -> Result<ListPage, S3Error> {
    let result: ListBucketResult =
        quick_xml::de::from_reader(body.as_ref()).map_err(|source| S3Error::Parse {
            bucket: bucket.to_owned(),
            source,
        })?;
    let url_encoded = result.encoding_type.as_deref() == Some("url");
    let mut objects = result.contents;
    if url_encoded {
        for obj in &mut objects {
            obj.key = decode_key(&obj.key)?;
        }
    }
    Ok(ListPage {
        objects,
        next_continuation_token: result.next_continuation_token,
    })
}

// S3 encodes spaces in keys as `+` and a literal `+` as `%2B`.
fn decode_key(key: &str) -> Result<String, S3Error> {
    match percent_decode_str(&key.replace('+', " ")).decode_utf8() {
        Ok(k) => Ok(k.into_owned()),
        Err(_) => Err(S3Error::UndecodableKey {
            key: key.to_owned(),
        }),
    }
}

/// Fetch every page of the listing of the objects under `url` and convert
/// them to [`ZarrArchiveFile`]s with paths relative to the URL's prefix.
///
/// Objects whose keys end in a slash (directory placeholders) are skipped.
/// If the prefix contains no objects at all, a warning is logged and an
/// empty list is returned.
pub async fn list_files<L>(lister: &L, url: &S3Url) -> Result<Vec<ZarrArchiveFile>, S3Error>
where
    L: ObjectLister + ?Sized,
{
    let prefix = url.listing_prefix();
    let mut files = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let page = lister
            .list_page(url.bucket(), &prefix, token.as_deref())
            .await?;
        pages += 1;
        debug!(
            "Fetched page {pages} of listing of {url}: {} objects",
            page.objects.len()
        );
        for obj in page.objects {
            if let Some(file) = to_archive_file(obj, &prefix)? {
                files.push(file);
            }
        }
        match page.next_continuation_token {
            Some(t) => token = Some(t),
            None => break,
        }
    }
    if files.is_empty() {
        warn!(
            "No files found under prefix {:?} in bucket {:?}; check that the URL is the fully qualified path to the Zarr root",
            url.prefix(),
            url.bucket()
        );
    }
    Ok(files)
}

fn to_archive_file(obj: ListedObject, prefix: &str) -> Result<Option<ZarrArchiveFile>, S3Error> {
    let Some(relkey) = obj.key.strip_prefix(prefix) else {
        return Err(S3Error::KeyOutsidePrefix {
            key: obj.key,
            prefix: prefix.to_owned(),
        });
    };
    if relkey.is_empty() || relkey.ends_with('/') {
        debug!("Skipping directory placeholder object {:?}", obj.key);
        return Ok(None);
    }
    let path = match EntryPath::try_from(relkey) {
        Ok(p) => p,
        Err(source) => {
            return Err(S3Error::BadKey {
                key: obj.key,
                source,
            })
        }
    };
    Ok(Some(ZarrArchiveFile {
        path,
        size: obj.size,
        digest: obj.etag.trim_matches('"').to_owned(),
    }))
}

/// A Zarr stored under a prefix in an S3 bucket
#[derive(Debug)]
pub struct S3Zarr<L = HttpLister> {
    url: S3Url,
    lister: L,
}

impl S3Zarr<HttpLister> {
    pub fn new(url: S3Url, options: S3Options) -> Result<Self, S3Error> {
        Ok(S3Zarr {
            url,
            lister: HttpLister::new(options)?,
        })
    }
}

impl<L: ObjectLister> S3Zarr<L> {
    pub fn with_lister(url: S3Url, lister: L) -> Self {
        S3Zarr { url, lister }
    }

    pub fn url(&self) -> &S3Url {
        &self.url
    }

    /// List every object in the Zarr and return the unprocessed checksum tree
    pub async fn checksum_tree(&self) -> Result<ZarrChecksumTree, ChecksumError> {
        info!("Retrieving files from {} ...", self.url);
        let files = list_files(&self.lister, &self.url).await?;
        info!("Found {} files", files.len());
        Ok(files.into_iter().collect())
    }

    /// Compute the checksum of the Zarr
    pub async fn checksum(&self) -> Result<ZarrDirectoryDigest, ChecksumError> {
        Ok(self.checksum_tree().await?.process()?)
    }
}
