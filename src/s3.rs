//! Read-only access to public S3 buckets over plain HTTPS.

use quick_xml::{events::Event, Reader};
use reqwest::Url;

use crate::{errors::FogToolsErr, transport::Fetch};

/// One page of a ListObjectsV2 response.
#[derive(Debug, Default, PartialEq)]
struct ListPage {
    keys: Vec<String>,
    next_token: Option<String>,
}

/// List all keys in the bucket at `bucket_url` that start with `prefix`.
pub fn list_keys<F: Fetch + ?Sized>(
    fetch: &F,
    bucket_url: &str,
    prefix: &str,
) -> Result<Vec<String>, FogToolsErr> {
    let mut keys = vec![];
    let mut token: Option<String> = None;

    loop {
        let url = list_url(bucket_url, prefix, token.as_deref())?;
        let body = fetch.fetch(&url)?.ok_or_else(|| FogToolsErr::HttpStatus {
            url: url.clone(),
            status: 404,
        })?;

        let page = parse_list_page(&String::from_utf8_lossy(&body))?;
        keys.extend(page.keys);

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(keys)
}

/// The HTTPS URL of an object.
pub fn object_url(bucket_url: &str, key: &str) -> String {
    format!("{}/{}", bucket_url.trim_end_matches('/'), key)
}

fn list_url(bucket_url: &str, prefix: &str, token: Option<&str>) -> Result<String, FogToolsErr> {
    let base = format!("{}/", bucket_url.trim_end_matches('/'));
    let mut params = vec![("list-type", "2"), ("prefix", prefix)];
    if let Some(token) = token {
        params.push(("continuation-token", token));
    }

    Url::parse_with_params(&base, &params)
        .map(|url| url.to_string())
        .map_err(|err| FogToolsErr::GeneralError(err.to_string()))
}

fn parse_list_page(xml: &str) -> Result<ListPage, FogToolsErr> {
    #[derive(PartialEq)]
    enum Field {
        Key,
        NextToken,
        Other,
    }

    let mut reader = Reader::from_str(xml);
    let mut page = ListPage::default();
    let mut field = Field::Other;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                field = match e.name().as_ref() {
                    b"Key" => Field::Key,
                    b"NextContinuationToken" => Field::NextToken,
                    _ => Field::Other,
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?.trim().to_owned();
                match field {
                    Field::Key if !text.is_empty() => page.keys.push(text),
                    Field::NextToken if !text.is_empty() => page.next_token = Some(text),
                    _ => {}
                }
            }
            Event::End(_) => field = Field::Other,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(page)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;
    use crate::transport::mock::MockFetcher;

    const PAGE_ONE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>noaa-goes16</Name>
  <Prefix>ABI-L1b-RadC/2020/061/12/</Prefix>
  <KeyCount>2</KeyCount>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>1a+b/c=</NextContinuationToken>
  <Contents><Key>ABI-L1b-RadC/2020/061/12/a.nc</Key><Size>10</Size></Contents>
  <Contents><Key>ABI-L1b-RadC/2020/061/12/b.nc</Key><Size>12</Size></Contents>
</ListBucketResult>"#;

    const PAGE_TWO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <IsTruncated>false</IsTruncated>
  <Contents><Key>ABI-L1b-RadC/2020/061/12/c.nc</Key></Contents>
</ListBucketResult>"#;

    #[test]
    fn test_parse_list_page() {
        let page = parse_list_page(PAGE_ONE).unwrap();
        assert_eq!(
            page.keys,
            vec![
                "ABI-L1b-RadC/2020/061/12/a.nc",
                "ABI-L1b-RadC/2020/061/12/b.nc"
            ]
        );
        assert_eq!(page.next_token.as_deref(), Some("1a+b/c="));

        let page = parse_list_page(PAGE_TWO).unwrap();
        assert_eq!(page.keys.len(), 1);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_list_keys_follows_continuation() {
        let bucket = "https://bucket.example";
        let prefix = "ABI-L1b-RadC/2020/061/12/";
        let first = list_url(bucket, prefix, None).unwrap();
        let second = list_url(bucket, prefix, Some("1a+b/c=")).unwrap();
        let fetcher = MockFetcher::new()
            .respond(&first, PAGE_ONE.as_bytes())
            .respond(&second, PAGE_TWO.as_bytes());

        let keys = list_keys(&fetcher, bucket, prefix).unwrap();

        assert_eq!(keys.len(), 3);
        assert_eq!(fetcher.calls(), vec![first, second]);
    }

    #[test]
    fn test_list_url_escapes_token() {
        let url = list_url("https://bucket.example/", "a/b/", Some("x+y/z=")).unwrap();
        assert!(url.starts_with("https://bucket.example/?list-type=2&prefix=a%2Fb%2F"));
        assert!(url.contains("continuation-token=x%2By%2Fz%3D"));
    }

    #[test]
    fn test_object_url() {
        assert_eq!(
            object_url("https://bucket.example/", "2019/94733099999.csv"),
            "https://bucket.example/2019/94733099999.csv"
        );
    }
}
