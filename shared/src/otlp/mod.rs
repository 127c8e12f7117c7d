//! OpenTelemetry Protocol (OTLP) support.
//!
//! The message types below are the subset of the OTLP v1 protobuf schema this
//! service consumes. They derive both `prost::Message` (binary) and
//! `serde::Deserialize` (OTLP/JSON: camelCase keys, 64-bit integers as
//! strings, ids as hex), so one set of types serves both encodings.
//!
//! Fields of the upstream schema that are not listed here are skipped as
//! unknown fields by the protobuf decoder and ignored by the JSON decoder.

pub mod conversions;
pub(crate) mod json;

#[allow(clippy::all)]
#[allow(clippy::pedantic)]
#[allow(missing_docs)]
pub mod proto {
    //! OTLP message types.

    pub mod common {
        //! Common OTLP types.
        pub mod v1 {
            use serde::Deserialize;

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct AnyValue {
                #[prost(oneof = "any_value::Value", tags = "1, 2, 3, 4, 5, 6, 7")]
                #[serde(flatten)]
                pub value: Option<any_value::Value>,
            }

            pub mod any_value {
                use serde::Deserialize;

                #[derive(Clone, PartialEq, prost::Oneof, Deserialize)]
                #[serde(rename_all = "camelCase")]
                pub enum Value {
                    #[prost(string, tag = "1")]
                    StringValue(String),
                    #[prost(bool, tag = "2")]
                    BoolValue(bool),
                    #[prost(int64, tag = "3")]
                    #[serde(deserialize_with = "crate::otlp::json::i64_from_any")]
                    IntValue(i64),
                    #[prost(double, tag = "4")]
                    DoubleValue(f64),
                    #[prost(message, tag = "5")]
                    ArrayValue(super::ArrayValue),
                    #[prost(message, tag = "6")]
                    KvlistValue(super::KeyValueList),
                    #[prost(bytes = "vec", tag = "7")]
                    #[serde(deserialize_with = "crate::otlp::json::base64_bytes")]
                    BytesValue(Vec<u8>),
                }
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct ArrayValue {
                #[prost(message, repeated, tag = "1")]
                pub values: Vec<AnyValue>,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct KeyValueList {
                #[prost(message, repeated, tag = "1")]
                pub values: Vec<KeyValue>,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct KeyValue {
                #[prost(string, tag = "1")]
                pub key: String,
                #[prost(message, optional, tag = "2")]
                pub value: Option<AnyValue>,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct InstrumentationScope {
                #[prost(string, tag = "1")]
                pub name: String,
                #[prost(string, tag = "2")]
                pub version: String,
                #[prost(message, repeated, tag = "3")]
                pub attributes: Vec<KeyValue>,
                #[prost(uint32, tag = "4")]
                pub dropped_attributes_count: u32,
            }
        }
    }

    pub mod resource {
        //! Resource types.
        pub mod v1 {
            use serde::Deserialize;

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct Resource {
                #[prost(message, repeated, tag = "1")]
                pub attributes: Vec<super::super::common::v1::KeyValue>,
                #[prost(uint32, tag = "2")]
                pub dropped_attributes_count: u32,
            }
        }
    }

    pub mod metrics {
        //! Metric types.
        pub mod v1 {
            use super::super::common::v1::{InstrumentationScope, KeyValue};
            use super::super::resource::v1::Resource;
            use serde::Deserialize;

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct ResourceMetrics {
                #[prost(message, optional, tag = "1")]
                pub resource: Option<Resource>,
                #[prost(message, repeated, tag = "2")]
                pub scope_metrics: Vec<ScopeMetrics>,
                #[prost(string, tag = "3")]
                pub schema_url: String,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct ScopeMetrics {
                #[prost(message, optional, tag = "1")]
                pub scope: Option<InstrumentationScope>,
                #[prost(message, repeated, tag = "2")]
                pub metrics: Vec<Metric>,
                #[prost(string, tag = "3")]
                pub schema_url: String,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct Metric {
                #[prost(string, tag = "1")]
                pub name: String,
                #[prost(string, tag = "2")]
                pub description: String,
                #[prost(string, tag = "3")]
                pub unit: String,
                #[prost(oneof = "metric::Data", tags = "5, 7")]
                #[serde(flatten)]
                pub data: Option<metric::Data>,
            }

            pub mod metric {
                use serde::Deserialize;

                /// Histogram, exponential histogram and summary payloads are
                /// not consumed and decode as unknown fields.
                #[derive(Clone, PartialEq, prost::Oneof, Deserialize)]
                #[serde(rename_all = "camelCase")]
                pub enum Data {
                    #[prost(message, tag = "5")]
                    Gauge(super::Gauge),
                    #[prost(message, tag = "7")]
                    Sum(super::Sum),
                }
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct Gauge {
                #[prost(message, repeated, tag = "1")]
                pub data_points: Vec<NumberDataPoint>,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct Sum {
                #[prost(message, repeated, tag = "1")]
                pub data_points: Vec<NumberDataPoint>,
                #[prost(int32, tag = "2")]
                #[serde(deserialize_with = "crate::otlp::json::enum_from_any")]
                pub aggregation_temporality: i32,
                #[prost(bool, tag = "3")]
                pub is_monotonic: bool,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct NumberDataPoint {
                #[prost(message, repeated, tag = "7")]
                pub attributes: Vec<KeyValue>,
                #[prost(fixed64, tag = "2")]
                #[serde(deserialize_with = "crate::otlp::json::u64_from_any")]
                pub start_time_unix_nano: u64,
                #[prost(fixed64, tag = "3")]
                #[serde(deserialize_with = "crate::otlp::json::u64_from_any")]
                pub time_unix_nano: u64,
                #[prost(fixed32, tag = "8")]
                pub flags: u32,
                #[prost(oneof = "number_data_point::Value", tags = "4, 6")]
                #[serde(flatten)]
                pub value: Option<number_data_point::Value>,
            }

            pub mod number_data_point {
                use serde::Deserialize;

                #[derive(Clone, PartialEq, prost::Oneof, Deserialize)]
                #[serde(rename_all = "camelCase")]
                pub enum Value {
                    #[prost(double, tag = "4")]
                    #[serde(deserialize_with = "crate::otlp::json::f64_from_any")]
                    AsDouble(f64),
                    #[prost(sfixed64, tag = "6")]
                    #[serde(deserialize_with = "crate::otlp::json::i64_from_any")]
                    AsInt(i64),
                }
            }
        }
    }

    pub mod logs {
        //! Log types.
        pub mod v1 {
            use super::super::common::v1::{AnyValue, InstrumentationScope, KeyValue};
            use super::super::resource::v1::Resource;
            use serde::Deserialize;

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct ResourceLogs {
                #[prost(message, optional, tag = "1")]
                pub resource: Option<Resource>,
                #[prost(message, repeated, tag = "2")]
                pub scope_logs: Vec<ScopeLogs>,
                #[prost(string, tag = "3")]
                pub schema_url: String,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct ScopeLogs {
                #[prost(message, optional, tag = "1")]
                pub scope: Option<InstrumentationScope>,
                #[prost(message, repeated, tag = "2")]
                pub log_records: Vec<LogRecord>,
                #[prost(string, tag = "3")]
                pub schema_url: String,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct LogRecord {
                #[prost(fixed64, tag = "1")]
                #[serde(deserialize_with = "crate::otlp::json::u64_from_any")]
                pub time_unix_nano: u64,
                #[prost(fixed64, tag = "11")]
                #[serde(deserialize_with = "crate::otlp::json::u64_from_any")]
                pub observed_time_unix_nano: u64,
                #[prost(int32, tag = "2")]
                #[serde(deserialize_with = "crate::otlp::json::enum_from_any")]
                pub severity_number: i32,
                #[prost(string, tag = "3")]
                pub severity_text: String,
                #[prost(message, optional, tag = "5")]
                pub body: Option<AnyValue>,
                #[prost(message, repeated, tag = "6")]
                pub attributes: Vec<KeyValue>,
                #[prost(uint32, tag = "7")]
                pub dropped_attributes_count: u32,
                #[prost(fixed32, tag = "8")]
                pub flags: u32,
                #[prost(bytes = "vec", tag = "9")]
                #[serde(deserialize_with = "crate::otlp::json::hex_bytes")]
                pub trace_id: Vec<u8>,
                #[prost(bytes = "vec", tag = "10")]
                #[serde(deserialize_with = "crate::otlp::json::hex_bytes")]
                pub span_id: Vec<u8>,
            }
        }
    }

    pub mod trace {
        //! Trace types.
        pub mod v1 {
            use super::super::common::v1::{InstrumentationScope, KeyValue};
            use super::super::resource::v1::Resource;
            use serde::Deserialize;

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct ResourceSpans {
                #[prost(message, optional, tag = "1")]
                pub resource: Option<Resource>,
                #[prost(message, repeated, tag = "2")]
                pub scope_spans: Vec<ScopeSpans>,
                #[prost(string, tag = "3")]
                pub schema_url: String,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct ScopeSpans {
                #[prost(message, optional, tag = "1")]
                pub scope: Option<InstrumentationScope>,
                #[prost(message, repeated, tag = "2")]
                pub spans: Vec<Span>,
                #[prost(string, tag = "3")]
                pub schema_url: String,
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct Span {
                #[prost(bytes = "vec", tag = "1")]
                #[serde(deserialize_with = "crate::otlp::json::hex_bytes")]
                pub trace_id: Vec<u8>,
                #[prost(bytes = "vec", tag = "2")]
                #[serde(deserialize_with = "crate::otlp::json::hex_bytes")]
                pub span_id: Vec<u8>,
                #[prost(string, tag = "3")]
                pub trace_state: String,
                #[prost(bytes = "vec", tag = "4")]
                #[serde(deserialize_with = "crate::otlp::json::hex_bytes")]
                pub parent_span_id: Vec<u8>,
                #[prost(string, tag = "5")]
                pub name: String,
                #[prost(int32, tag = "6")]
                #[serde(deserialize_with = "crate::otlp::json::enum_from_any")]
                pub kind: i32,
                #[prost(fixed64, tag = "7")]
                #[serde(deserialize_with = "crate::otlp::json::u64_from_any")]
                pub start_time_unix_nano: u64,
                #[prost(fixed64, tag = "8")]
                #[serde(deserialize_with = "crate::otlp::json::u64_from_any")]
                pub end_time_unix_nano: u64,
                #[prost(message, repeated, tag = "9")]
                pub attributes: Vec<KeyValue>,
                #[prost(uint32, tag = "10")]
                pub dropped_attributes_count: u32,
                #[prost(message, repeated, tag = "11")]
                pub events: Vec<span::Event>,
                #[prost(uint32, tag = "12")]
                pub dropped_events_count: u32,
                #[prost(message, optional, tag = "15")]
                pub status: Option<Status>,
                #[prost(fixed32, tag = "16")]
                pub flags: u32,
            }

            pub mod span {
                use super::super::super::common::v1::KeyValue;
                use serde::Deserialize;

                #[derive(Clone, PartialEq, prost::Message, Deserialize)]
                #[serde(rename_all = "camelCase", default)]
                pub struct Event {
                    #[prost(fixed64, tag = "1")]
                    #[serde(deserialize_with = "crate::otlp::json::u64_from_any")]
                    pub time_unix_nano: u64,
                    #[prost(string, tag = "2")]
                    pub name: String,
                    #[prost(message, repeated, tag = "3")]
                    pub attributes: Vec<KeyValue>,
                    #[prost(uint32, tag = "4")]
                    pub dropped_attributes_count: u32,
                }
            }

            #[derive(Clone, PartialEq, prost::Message, Deserialize)]
            #[serde(rename_all = "camelCase", default)]
            pub struct Status {
                #[prost(string, tag = "2")]
                pub message: String,
                #[prost(int32, tag = "3")]
                #[serde(deserialize_with = "crate::otlp::json::enum_from_any")]
                pub code: i32,
            }
        }
    }

    pub mod collector {
        //! Export request envelopes.

        pub mod metrics {
            //! Metrics export request.
            pub mod v1 {
                use serde::Deserialize;

                #[derive(Clone, PartialEq, prost::Message, Deserialize)]
                #[serde(rename_all = "camelCase", default)]
                pub struct ExportMetricsServiceRequest {
                    #[prost(message, repeated, tag = "1")]
                    pub resource_metrics:
                        Vec<super::super::super::metrics::v1::ResourceMetrics>,
                }
            }
        }

        pub mod logs {
            //! Logs export request.
            pub mod v1 {
                use serde::Deserialize;

                #[derive(Clone, PartialEq, prost::Message, Deserialize)]
                #[serde(rename_all = "camelCase", default)]
                pub struct ExportLogsServiceRequest {
                    #[prost(message, repeated, tag = "1")]
                    pub resource_logs: Vec<super::super::super::logs::v1::ResourceLogs>,
                }
            }
        }

        pub mod trace {
            //! Trace export request.
            pub mod v1 {
                use serde::Deserialize;

                #[derive(Clone, PartialEq, prost::Message, Deserialize)]
                #[serde(rename_all = "camelCase", default)]
                pub struct ExportTraceServiceRequest {
                    #[prost(message, repeated, tag = "1")]
                    pub resource_spans: Vec<super::super::super::trace::v1::ResourceSpans>,
                }
            }
        }
    }
}
