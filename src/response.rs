//! Response assembly.

use crate::header::{Header, OPCODE_QUERY, RCODE_NOT_IMPLEMENTED, RCODE_NO_ERROR};
use crate::message::{Message, Question, ResourceRecord};

/// Whether the request is a standard query this server resolves.
pub fn is_standard_query(header: &Header) -> bool {
    header.opcode == OPCODE_QUERY
}

/// Build the response to a request.
///
/// QR is set, the counts follow the sections, and RCODE is 0 for a standard
/// query or 4 (Not Implemented) for any other opcode. Every other header bit
/// is copied from the request.
pub fn build_response(
    request: &Header,
    questions: Vec<Question>,
    answers: Vec<ResourceRecord>,
) -> Message {
    let header = Header {
        query_response: true,
        rcode: if is_standard_query(request) {
            RCODE_NO_ERROR
        } else {
            RCODE_NOT_IMPLEMENTED
        },
        qd_count: questions.len() as u16,
        an_count: answers.len() as u16,
        ns_count: 0,
        ar_count: 0,
        ..*request
    };

    Message {
        header,
        questions,
        answers,
    }
}
