//! Talking to the TSD: building `/q` queries, reading the ascii answer and fetching it over
//! HTTP.

#[cfg(feature = "http")]
use std::time::Duration;

use crate::config::{CheckConfig, Downsample};
use crate::error::FetchError;
use crate::sample::Sample;

/// A single `/q` request against the TSD.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    range: String,
    metric: String,
}

impl Query {
    /// Everything from `duration` seconds ago until now, as a recent check wants it.
    ///
    /// ```rust
    /// # use tsdcheck::{CheckConfig, Comparator, ThresholdSpec};
    /// # use tsdcheck::tsd::Query;
    /// let thresholds = ThresholdSpec::new(Some(5.0), Some(10.0), Comparator::Gt).unwrap();
    /// let mut config = CheckConfig::new("proc.loadavg.15min", thresholds);
    /// config.tags.push("host=web01".to_owned());
    /// assert_eq!(
    ///     Query::recent(&config).path(),
    ///     "/q?start=600s-ago&m=sum:proc.loadavg.15min{host=web01}&ascii&nagios"
    /// );
    /// ```
    pub fn recent(config: &CheckConfig) -> Self {
        let downsampling = match config.downsample {
            Downsample::None => String::new(),
            method => format!(":{}s-{}", config.duration, method),
        };
        let rate = if config.rate { "rate:" } else { "" };
        Query {
            range: format!("start={}s-ago", config.duration),
            metric: format!(
                "{}{}:{}{}{}",
                config.aggregator,
                downsampling,
                rate,
                config.metric,
                tag_filter(&config.tags)
            ),
        }
    }

    /// The data around one bucket: it reaches a full bucket width past both edges so the
    /// edges can be framed.
    pub fn bucket(config: &CheckConfig, start: i64, end: i64) -> Self {
        let size = config.bucket_size;
        Query {
            range: format!("start={}&end={}", start - size, end + size),
            metric: Self::bucket_metric(config),
        }
    }

    /// The metric expression bucket queries use.
    pub fn bucket_metric(config: &CheckConfig) -> String {
        format!(
            "{}:{}{}",
            config.aggregator,
            config.metric,
            tag_filter(&config.tags)
        )
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// The metric expression as it is printed. Pipes are special to nrpe.
    pub fn display_metric(&self) -> String {
        self.metric.replace('|', ":")
    }

    pub fn path(&self) -> String {
        format!("/q?{}&m={}&ascii&nagios", self.range, self.metric)
    }
}

fn tag_filter(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", tags.join(","))
    }
}

/// Parses the ascii output of the TSD, one `metric timestamp value tags...` line per sample.
///
/// Values are read as `f64`, integer counters stay exact up to 2^53.
pub fn parse_ascii(body: &str) -> Result<Vec<Sample>, FetchError> {
    let mut samples = Vec::new();

    for (i, line) in body.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(_metric) = fields.next() else {
            continue;
        };
        let malformed = |reason: String| FetchError::Malformed {
            line: i + 1,
            reason,
        };

        let timestamp = fields
            .next()
            .ok_or_else(|| malformed("missing timestamp".to_owned()))?;
        let timestamp: i64 = timestamp
            .parse()
            .map_err(|_| malformed(format!("invalid timestamp {:?}", timestamp)))?;

        let value = fields
            .next()
            .ok_or_else(|| malformed("missing value".to_owned()))?;
        let value: f64 = value
            .parse()
            .map_err(|_| malformed(format!("invalid value {:?}", value)))?;

        samples.push(Sample::new(timestamp, value));
    }

    Ok(samples)
}

/// Where samples come from.
pub trait SampleSource {
    fn fetch(&self, query: &Query) -> Result<Vec<Sample>, FetchError>;
}

/// A fixed set of samples answers every query with all of its samples.
impl SampleSource for Vec<Sample> {
    fn fetch(&self, _query: &Query) -> Result<Vec<Sample>, FetchError> {
        Ok(self.clone())
    }
}

/// Blocking HTTP client for a single TSD instance.
#[cfg(feature = "http")]
pub struct TsdClient {
    http: reqwest::blocking::Client,
    address: String,
}

#[cfg(feature = "http")]
impl TsdClient {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| FetchError::Connect {
                address: address.to_owned(),
                cause: e.to_string(),
            })?;

        Ok(TsdClient {
            http,
            address: address.to_owned(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                address: self.address.clone(),
            }
        } else {
            FetchError::Connect {
                address: self.address.clone(),
                cause: err.to_string(),
            }
        }
    }
}

#[cfg(feature = "http")]
impl SampleSource for TsdClient {
    fn fetch(&self, query: &Query) -> Result<Vec<Sample>, FetchError> {
        let url = format!("http://{}{}", self.address, query.path());
        tracing::debug!(%url, "querying TSD");

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().map_err(|e| self.transport_error(e))?;

        if status != reqwest::StatusCode::OK {
            tracing::debug!(%body, "TSD said");
            return Err(FetchError::Status {
                address: self.address.clone(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::trace!(%body, "TSD response");
        parse_ascii(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Aggregator, Comparator, ThresholdSpec};

    fn config() -> CheckConfig {
        let thresholds = ThresholdSpec::new(Some(5.0), Some(10.0), Comparator::Gt).unwrap();
        CheckConfig::new("http.hits", thresholds)
    }

    #[test]
    fn test_recent_query() {
        let mut config = config();
        assert_eq!(
            Query::recent(&config).path(),
            "/q?start=600s-ago&m=sum:http.hits&ascii&nagios"
        );

        config.rate = true;
        config.duration = 300;
        config.downsample = Downsample::Avg;
        config.aggregator = Aggregator::Max;
        config.tags = vec!["host=web01".to_owned(), "dc=a|b".to_owned()];
        let query = Query::recent(&config);
        assert_eq!(
            query.path(),
            "/q?start=300s-ago&m=max:300s-avg:rate:http.hits{host=web01,dc=a|b}&ascii&nagios"
        );
        assert_eq!(
            query.display_metric(),
            "max:300s-avg:rate:http.hits{host=web01,dc=a:b}"
        );
    }

    #[test]
    fn test_bucket_query() {
        let mut config = config();
        config.rate = true;
        config.bucket_size = 60;
        config.buckets_ago = 1;
        let query = Query::bucket(&config, 900, 959);
        assert_eq!(
            query.path(),
            "/q?start=840&end=1019&m=sum:http.hits&ascii&nagios"
        );
        assert_eq!(query.metric(), "sum:http.hits");
    }

    #[test]
    fn test_parse_ascii() {
        let body = "http.hits 1288900000 42 host=web01\n\
                    http.hits 1288900015 42.5 host=web01\n\
                    \n\
                    http.hits 1288900030 -3 host=web01\n";
        let samples = parse_ascii(body).unwrap();
        assert_eq!(
            samples,
            vec![
                Sample::new(1288900000, 42.0),
                Sample::new(1288900015, 42.5),
                Sample::new(1288900030, -3.0),
            ]
        );

        assert!(parse_ascii("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_ascii_malformed() {
        match parse_ascii("m 1 1\nm 1288900000\n") {
            Err(FetchError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_ascii("m 12x 1"),
            Err(FetchError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            parse_ascii("m 12 abc"),
            Err(FetchError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_parse_ascii_large_integers() {
        let body = "c 100 9007199254740000\nc 160 9007199254740992\n";
        let samples = parse_ascii(body).unwrap();
        assert_eq!(samples[1].value, 2f64.powi(53));
        assert_eq!(samples[1].value - samples[0].value, 992.0);
    }

    #[test]
    fn test_fixed_source() {
        let source = vec![Sample::new(1, 2.0)];
        let samples = source.fetch(&Query::recent(&config())).unwrap();
        assert_eq!(samples, vec![Sample::new(1, 2.0)]);
    }
}
