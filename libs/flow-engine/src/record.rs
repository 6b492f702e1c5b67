use std::fmt;

use codec_csv::{ColumnMap, RowSink, RowSource};

use crate::bucket::BucketId;
use crate::counter::parse_counter;
use crate::error::{EngineError, Result};

// ═══════════════════════════════════════════════════════════════
//  Column names
// ═══════════════════════════════════════════════════════════════

/// Raw flow export columns.
pub mod input {
    pub const TIMESTAMP: &str = "Timestamp";
    pub const DESTINATION_IP: &str = "Destination.IP";
    pub const PROTOCOL_NAME: &str = "ProtocolName";
    pub const FWD_PACKETS: &str = "Total.Fwd.Packets";
    pub const BWD_PACKETS: &str = "Total.Backward.Packets";
    pub const FWD_BYTES: &str = "Total.Length.of.Fwd.Packets";
    pub const BWD_BYTES: &str = "Total.Length.of.Bwd.Packets";
}

/// Aggregated per-hour columns, in output order.
pub mod compact {
    pub const TIMESTAMP: &str = "Timestamp";
    pub const DESTINATION_IP: &str = "Destination.IP";
    pub const PROTOCOL_NAME: &str = "ProtocolName";
    pub const PACKETS: &str = "Packets";
    pub const BYTES: &str = "Bytes";

    pub const HEADER: [&str; 5] = [TIMESTAMP, DESTINATION_IP, PROTOCOL_NAME, PACKETS, BYTES];
}

// ═══════════════════════════════════════════════════════════════
//  Records
// ═══════════════════════════════════════════════════════════════

/// Identity under which flow counters are summed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregationKey {
    pub bucket: BucketId,
    pub destination_ip: String,
    pub protocol: String,
}

impl AggregationKey {
    pub fn new(
        bucket: BucketId,
        destination_ip: impl Into<String>,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            bucket,
            destination_ip: destination_ip.into(),
            protocol: protocol.into(),
        }
    }
}

/// `bucket-ip-proto`, for logs. Not unique; compare keys, not their text.
impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.bucket, self.destination_ip, self.protocol)
    }
}

/// One decoded input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    pub key: AggregationKey,
    pub packets: u64,
    pub bytes: u64,
}

impl FlowRecord {
    pub fn bucket(&self) -> &BucketId {
        &self.key.bucket
    }
}

/// Running totals for one [`AggregationKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRecord {
    pub key: AggregationKey,
    pub packets: u64,
    pub bytes: u64,
}

impl AggregatedRecord {
    pub fn add(&mut self, record: &FlowRecord) {
        self.packets = self.packets.saturating_add(record.packets);
        self.bytes = self.bytes.saturating_add(record.bytes);
    }

    /// Write as one row of the compact schema.
    pub fn write_compact(&self, sink: &mut impl RowSink) -> Result<()> {
        let packets = self.packets.to_string();
        let bytes = self.bytes.to_string();
        sink.write_row(&[
            self.key.bucket.as_str(),
            self.key.destination_ip.as_str(),
            self.key.protocol.as_str(),
            packets.as_str(),
            bytes.as_str(),
        ])?;
        Ok(())
    }
}

impl From<FlowRecord> for AggregatedRecord {
    fn from(record: FlowRecord) -> Self {
        Self {
            key: record.key,
            packets: record.packets,
            bytes: record.bytes,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Decoders
// ═══════════════════════════════════════════════════════════════

/// Anything that yields flow records until exhausted.
pub trait FlowSource {
    /// `Ok(None)` is end of input.
    fn next_record(&mut self) -> Result<Option<FlowRecord>>;
}

fn field<'a>(row: &'a [String], position: usize, column: &'static str) -> Result<&'a str> {
    row.get(position)
        .map(String::as_str)
        .ok_or(EngineError::MalformedRow {
            column,
            position,
            found: row.len(),
        })
}

fn read_header(source: &mut impl RowSource) -> Result<ColumnMap> {
    let header = source.read_row()?.ok_or(EngineError::MissingHeader)?;
    Ok(ColumnMap::from_header(&header))
}

/// Positions of the raw export columns, resolved from the header once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputColumns {
    timestamp: usize,
    destination_ip: usize,
    protocol: usize,
    fwd_packets: usize,
    bwd_packets: usize,
    fwd_bytes: usize,
    bwd_bytes: usize,
}

impl InputColumns {
    pub fn resolve(map: &ColumnMap) -> Result<Self> {
        Ok(Self {
            timestamp: map.require(input::TIMESTAMP)?,
            destination_ip: map.require(input::DESTINATION_IP)?,
            protocol: map.require(input::PROTOCOL_NAME)?,
            fwd_packets: map.require(input::FWD_PACKETS)?,
            bwd_packets: map.require(input::BWD_PACKETS)?,
            fwd_bytes: map.require(input::FWD_BYTES)?,
            bwd_bytes: map.require(input::BWD_BYTES)?,
        })
    }

    /// Decode one raw export row.
    pub fn decode(&self, row: &[String]) -> Result<FlowRecord> {
        let bucket = BucketId::from_timestamp(field(row, self.timestamp, input::TIMESTAMP)?)?;
        let destination_ip = field(row, self.destination_ip, input::DESTINATION_IP)?;
        let protocol = field(row, self.protocol, input::PROTOCOL_NAME)?;

        let packets = self
            .counter(row, self.fwd_packets, input::FWD_PACKETS)?
            .saturating_add(self.counter(row, self.bwd_packets, input::BWD_PACKETS)?);
        let bytes = self
            .counter(row, self.fwd_bytes, input::FWD_BYTES)?
            .saturating_add(self.counter(row, self.bwd_bytes, input::BWD_BYTES)?);

        Ok(FlowRecord {
            key: AggregationKey::new(bucket, destination_ip, protocol),
            packets,
            bytes,
        })
    }

    fn counter(&self, row: &[String], position: usize, column: &'static str) -> Result<u64> {
        let text = field(row, position, column)?;
        parse_counter(text).ok_or_else(|| EngineError::MalformedCounter {
            column,
            text: text.to_string(),
        })
    }
}

/// Positions of the compact columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactColumns {
    bucket: usize,
    destination_ip: usize,
    protocol: usize,
    packets: usize,
    bytes: usize,
}

impl CompactColumns {
    pub fn resolve(map: &ColumnMap) -> Result<Self> {
        Ok(Self {
            bucket: map.require(compact::TIMESTAMP)?,
            destination_ip: map.require(compact::DESTINATION_IP)?,
            protocol: map.require(compact::PROTOCOL_NAME)?,
            packets: map.require(compact::PACKETS)?,
            bytes: map.require(compact::BYTES)?,
        })
    }

    /// Decode a row this engine wrote itself: fields verbatim, counters plain integers.
    pub fn decode(&self, row: &[String]) -> Result<FlowRecord> {
        let bucket = BucketId::verbatim(field(row, self.bucket, compact::TIMESTAMP)?.to_string());
        let destination_ip = field(row, self.destination_ip, compact::DESTINATION_IP)?;
        let protocol = field(row, self.protocol, compact::PROTOCOL_NAME)?;

        Ok(FlowRecord {
            key: AggregationKey::new(bucket, destination_ip, protocol),
            packets: Self::counter(row, self.packets, compact::PACKETS)?,
            bytes: Self::counter(row, self.bytes, compact::BYTES)?,
        })
    }

    fn counter(row: &[String], position: usize, column: &'static str) -> Result<u64> {
        let text = field(row, position, column)?;
        let malformed = || EngineError::MalformedCounter {
            column,
            text: text.to_string(),
        };
        // `u64::from_str` also takes a leading `+`, which is never written.
        if !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        text.parse().map_err(|_| malformed())
    }
}

/// Decodes raw flow export rows.
pub struct RecordDecoder<S> {
    source: S,
    columns: InputColumns,
}

impl<S: RowSource> RecordDecoder<S> {
    /// Reads and resolves the header row.
    pub fn new(mut source: S) -> Result<Self> {
        let columns = InputColumns::resolve(&read_header(&mut source)?)?;
        Ok(Self { source, columns })
    }
}

impl<S: RowSource> FlowSource for RecordDecoder<S> {
    fn next_record(&mut self) -> Result<Option<FlowRecord>> {
        let Some(row) = self.source.read_row()? else {
            return Ok(None);
        };
        self.columns
            .decode(&row)
            .map(Some)
            .map_err(|e| e.with_context(format!("line {}", self.source.line())))
    }
}

/// Decodes rows of the compact schema, e.g. partition files.
pub struct CompactDecoder<S> {
    source: S,
    columns: CompactColumns,
}

impl<S: RowSource> CompactDecoder<S> {
    pub fn new(mut source: S) -> Result<Self> {
        let columns = CompactColumns::resolve(&read_header(&mut source)?)?;
        Ok(Self { source, columns })
    }
}

impl<S: RowSource> FlowSource for CompactDecoder<S> {
    fn next_record(&mut self) -> Result<Option<FlowRecord>> {
        let Some(row) = self.source.read_row()? else {
            return Ok(None);
        };
        self.columns
            .decode(&row)
            .map(Some)
            .map_err(|e| e.with_context(format!("line {}", self.source.line())))
    }
}

#[cfg(test)]
mod tests {
    use codec_csv::{CsvReader, CsvWriter};

    use super::*;
    use crate::error::ErrorKind;

    const RAW: &str = "Destination.IP,Timestamp,Total.Fwd.Packets,Total.Backward.Packets,\
Total.Length.of.Fwd.Packets,Total.Length.of.Bwd.Packets,ProtocolName,Flow.ID
172.19.1.46,26/04/201711:11:17,22,55,132,110414,HTTP_PROXY,ignored
10.0.0.1,26/04/201711:59:00,3e+05,1,0,0,DNS,ignored
";

    fn bucket(s: &str) -> BucketId {
        BucketId::parse(s).unwrap()
    }

    #[test]
    fn decodes_raw_rows_in_any_column_order() {
        let mut decoder = RecordDecoder::new(CsvReader::new(RAW.as_bytes())).unwrap();

        let first = decoder.next_record().unwrap().unwrap();
        assert_eq!(first.bucket().as_str(), "2017-04-26-11");
        assert_eq!(first.key.destination_ip, "172.19.1.46");
        assert_eq!(first.key.protocol, "HTTP_PROXY");
        assert_eq!(first.key.to_string(), "2017-04-26-11-172.19.1.46-HTTP_PROXY");
        assert_eq!(first.packets, 77);
        assert_eq!(first.bytes, 110546);

        let second = decoder.next_record().unwrap().unwrap();
        assert_eq!(second.packets, 300_001);
        assert_eq!(second.bytes, 0);

        assert!(decoder.next_record().unwrap().is_none());
    }

    #[test]
    fn header_only_input_is_empty_not_an_error() {
        let header = RAW.lines().next().unwrap();
        let mut decoder = RecordDecoder::new(CsvReader::new(header.as_bytes())).unwrap();
        assert!(decoder.next_record().unwrap().is_none());
    }

    #[test]
    fn missing_header_and_columns_are_format_errors() {
        let err = RecordDecoder::new(CsvReader::new("".as_bytes())).err().unwrap();
        assert!(matches!(err, EngineError::MissingHeader));

        let err = RecordDecoder::new(CsvReader::new("Timestamp,Destination.IP\n".as_bytes()))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn bad_fields_report_their_line() {
        let header = RAW.lines().next().unwrap();
        let input = format!("{header}\n172.19.1.46,26/04/2017,1,1,1,1,DNS,x\n");
        let mut decoder = RecordDecoder::new(CsvReader::new(input.as_bytes())).unwrap();
        let err = decoder.next_record().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedTimestamp);
        assert!(err.to_string().starts_with("line 2: "));

        let input = format!("{header}\n172.19.1.46,26/04/201711:11:17,1,x,1,1,DNS,x\n");
        let mut decoder = RecordDecoder::new(CsvReader::new(input.as_bytes())).unwrap();
        assert_eq!(decoder.next_record().unwrap_err().kind(), ErrorKind::MalformedCounter);

        let input = format!("{header}\n172.19.1.46,26/04/201711:11:17\n");
        let mut decoder = RecordDecoder::new(CsvReader::new(input.as_bytes())).unwrap();
        assert_eq!(decoder.next_record().unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn compact_rows_read_back_verbatim() {
        let input = "Timestamp,Destination.IP,ProtocolName,Packets,Bytes\n\
2017-04-26-11,172.19.1.46,HTTP_PROXY,77,110546\n";
        let mut decoder = CompactDecoder::new(CsvReader::new(input.as_bytes())).unwrap();
        let rec = decoder.next_record().unwrap().unwrap();
        assert_eq!(
            rec.key,
            AggregationKey::new(bucket("2017-04-26-11"), "172.19.1.46", "HTTP_PROXY")
        );
        assert_eq!((rec.packets, rec.bytes), (77, 110546));
        assert!(decoder.next_record().unwrap().is_none());
    }

    #[test]
    fn compact_counters_must_be_plain_integers() {
        let input = "Timestamp,Destination.IP,ProtocolName,Packets,Bytes\n\
2017-04-26-11,172.19.1.46,HTTP_PROXY,3e+05,1\n";
        let mut decoder = CompactDecoder::new(CsvReader::new(input.as_bytes())).unwrap();
        assert_eq!(decoder.next_record().unwrap_err().kind(), ErrorKind::MalformedCounter);

        for bad in ["+77", "-0", " 77", "", "18446744073709551616"] {
            let input = format!(
                "Timestamp,Destination.IP,ProtocolName,Packets,Bytes\n\
2017-04-26-11,172.19.1.46,HTTP_PROXY,{bad},1\n"
            );
            let mut decoder = CompactDecoder::new(CsvReader::new(input.as_bytes())).unwrap();
            let err = decoder.next_record().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedCounter, "{bad:?}");
        }
    }

    #[test]
    fn counter_sums_saturate_instead_of_wrapping() {
        let header = RAW.lines().next().unwrap();
        let input = format!("{header}\n172.19.1.46,26/04/201711:11:17,1e20,1,1,1e30,DNS,x\n");
        let mut decoder = RecordDecoder::new(CsvReader::new(input.as_bytes())).unwrap();
        let rec = decoder.next_record().unwrap().unwrap();
        assert_eq!(rec.packets, u64::MAX);
        assert_eq!(rec.bytes, u64::MAX);

        let mut total = AggregatedRecord::from(rec.clone());
        total.add(&rec);
        assert_eq!((total.packets, total.bytes), (u64::MAX, u64::MAX));
    }

    #[test]
    fn both_decoders_derive_the_same_key() {
        let mut raw = RecordDecoder::new(CsvReader::new(RAW.as_bytes())).unwrap();
        let decoded = raw.next_record().unwrap().unwrap();

        let mut w = CsvWriter::new(Vec::new());
        w.write_row(&compact::HEADER).unwrap();
        AggregatedRecord::from(decoded.clone()).write_compact(&mut w).unwrap();
        let bytes = w.into_inner().unwrap();

        let mut compact = CompactDecoder::new(CsvReader::new(bytes.as_slice())).unwrap();
        assert_eq!(compact.next_record().unwrap().unwrap(), decoded);
    }

    #[test]
    fn keys_are_equal_iff_all_fields_are_equal() {
        let b = bucket("2017-04-26-11");
        let key = AggregationKey::new(b.clone(), "1.1.1.1", "GOOGLE");
        assert_eq!(key, AggregationKey::new(b.clone(), "1.1.1.1", "GOOGLE"));
        assert_ne!(key, AggregationKey::new(b.clone(), "1.1.1.2", "GOOGLE"));
        assert_ne!(key, AggregationKey::new(b.clone(), "1.1.1.1", "DNS"));
        assert_ne!(key, AggregationKey::new(bucket("2017-04-26-12"), "1.1.1.1", "GOOGLE"));

        // Same rendered text, different identities.
        let a = AggregationKey::new(b.clone(), "x-y", "z");
        let c = AggregationKey::new(b, "x", "y-z");
        assert_eq!(a.to_string(), c.to_string());
        assert_ne!(a, c);
    }
}
