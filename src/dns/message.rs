//! DNS messages on top of `hickory-proto`.
//!
//! Answers keep their record data as a raw range of the response, so the
//! caller decides what a short or odd record means instead of the whole
//! message failing to decode.

use hickory_proto::op::{Header, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncodable};
use std::ops::Range;

/// One resource record from the answer section. `rdata` indexes into the
/// response it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub record_type: RecordType,
    pub class: u16,
    pub ttl: u32,
    pub rdata: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct Response<'a> {
    pub bytes: &'a [u8],
    pub header: Header,
    pub answers: Vec<RawRecord>,
}

impl<'a> Response<'a> {
    /// Reads the header and every section, keeping the answers.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, &'static str> {
        let mut decoder = BinDecoder::new(bytes);
        let header = Header::read(&mut decoder).map_err(|_| "message shorter than header")?;

        for _ in 0..header.query_count() {
            Query::read(&mut decoder).map_err(|_| "malformed question")?;
        }

        let answer_count = u32::from(header.answer_count());
        let record_count = answer_count
            + u32::from(header.name_server_count())
            + u32::from(header.additional_count());

        let mut answers = Vec::with_capacity(usize::from(header.answer_count()));
        for index in 0..record_count {
            let record = read_record(&mut decoder)?;
            if index < answer_count {
                answers.push(record);
            }
        }

        Ok(Self {
            bytes,
            header,
            answers,
        })
    }

    pub fn is_response(&self) -> bool {
        self.header.message_type() == MessageType::Response
    }

    pub fn rdata(&self, record: &RawRecord) -> &'a [u8] {
        &self.bytes[record.rdata.clone()]
    }

    /// Expands the possibly compressed name at `offset` against the whole
    /// response. The trailing root dot is dropped.
    pub fn name_at(&self, offset: usize) -> Option<String> {
        if offset >= self.bytes.len() {
            return None;
        }
        let mut decoder = BinDecoder::new(self.bytes).clone(u16::try_from(offset).ok()?);
        let name = Name::read(&mut decoder).ok()?;
        let name = name.to_ascii();
        Some(name.strip_suffix('.').unwrap_or(&name).to_string())
    }
}

fn read_record(decoder: &mut BinDecoder<'_>) -> Result<RawRecord, &'static str> {
    const TRUNCATED: &str = "truncated resource record";

    Name::read(decoder).map_err(|_| "malformed record name")?;
    let record_type = RecordType::from(decoder.read_u16().map_err(|_| TRUNCATED)?.unverified());
    let class = decoder.read_u16().map_err(|_| TRUNCATED)?.unverified();
    let ttl = decoder.read_u32().map_err(|_| TRUNCATED)?.unverified();
    let rdata_len = usize::from(decoder.read_u16().map_err(|_| TRUNCATED)?.unverified());

    let start = decoder.index();
    decoder
        .read_slice(rdata_len)
        .map_err(|_| "truncated record data")?;

    Ok(RawRecord {
        record_type,
        class,
        ttl,
        rdata: start..start + rdata_len,
    })
}

/// Reads just the header, for matching replies to queries.
pub fn peek_header(bytes: &[u8]) -> Option<Header> {
    Header::read(&mut BinDecoder::new(bytes)).ok()
}

/// Builds a recursive query for `name` with a single question.
pub fn encode_query(id: u16, name: &str, record_type: RecordType) -> Result<Vec<u8>, &'static str> {
    let name = Name::from_ascii(name).map_err(|_| "not a valid domain name")?;
    if name.num_labels() == 0 {
        return Err("name is empty");
    }

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name, record_type));

    message.to_vec().map_err(|_| "query could not be encoded")
}
