//! Pull-style text exposition of the registry.

use crate::engine::registry::{MetricDescriptor, MetricValue};
use crate::error::PublishError;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

/// Content type of [`render`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

fn help_for(descriptor: &MetricDescriptor) -> &str {
    if descriptor.help.is_empty() {
        &descriptor.name
    } else {
        &descriptor.help
    }
}

fn encode_error(error: prometheus::Error) -> PublishError {
    PublishError::Encode(error.to_string())
}

/// Render every descriptor as gauges in the text exposition format.
///
/// Scalars that were never written are left out; labeled metrics produce
/// one line per label value.
pub fn render<'a, I>(descriptors: I) -> Result<String, PublishError>
where
    I: IntoIterator<Item = &'a MetricDescriptor>,
{
    let registry = Registry::new();

    for descriptor in descriptors {
        let opts = Opts::new(&descriptor.name, help_for(descriptor));
        match &descriptor.value {
            MetricValue::Scalar { value: None } => {}
            MetricValue::Scalar { value: Some(value) } => {
                let gauge = Gauge::with_opts(opts).map_err(encode_error)?;
                gauge.set(*value);
                registry.register(Box::new(gauge)).map_err(encode_error)?;
            }
            MetricValue::Labeled { label, series } => {
                if series.is_empty() {
                    continue;
                }
                let gauge = GaugeVec::new(opts, &[label.as_str()]).map_err(encode_error)?;
                for (label_value, value) in series {
                    gauge.with_label_values(&[label_value.as_str()]).set(*value);
                }
                registry.register(Box::new(gauge)).map_err(encode_error)?;
            }
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .map_err(encode_error)?;
    String::from_utf8(buffer).map_err(|e| PublishError::Encode(e.to_string()))
}
