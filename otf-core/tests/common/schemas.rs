//! Token streams and buffer builders shared by the programmatic tests

use otf_core::{ByteOrder, Ir, PrimitiveType, Signal, INVALID_ID, VARIABLE_SIZE};

pub const GROUP_TEMPLATE_ID: u16 = 100;
pub const NESTED_TEMPLATE_ID: u16 = 200;

const LE: ByteOrder = ByteOrder::LittleEndian;
const NONE: PrimitiveType = PrimitiveType::None;

/// `messageHeader { templateId: uint16 }`
pub fn header_ir() -> Ir {
    let mut ir = Ir::new();
    ir.add_token(0, 0, Signal::BeginComposite, LE, NONE, INVALID_ID, "messageHeader")
        .add_token(0, 2, Signal::Encoding, LE, PrimitiveType::Uint16, INVALID_ID, "templateId")
        .add_token(0, 0, Signal::EndComposite, LE, NONE, INVALID_ID, "messageHeader");
    ir
}

/// `messageHeader { blockLength, templateId, version, reserved }`, all uint16.
pub fn full_header_ir() -> Ir {
    let mut ir = Ir::new();
    ir.add_token(0, 0, Signal::BeginComposite, LE, NONE, INVALID_ID, "messageHeader");
    for (i, name) in ["blockLength", "templateId", "version", "reserved"].into_iter().enumerate() {
        ir.add_token(i as u32 * 2, 2, Signal::Encoding, LE, PrimitiveType::Uint16, INVALID_ID, name);
    }
    ir.add_token(0, 0, Signal::EndComposite, LE, NONE, INVALID_ID, "messageHeader");
    ir
}

fn dimension(ir: &mut Ir) {
    ir.add_token(0, 0, Signal::BeginComposite, LE, NONE, INVALID_ID, "groupSizeEncoding")
        .add_token(0, 2, Signal::Encoding, LE, PrimitiveType::Uint16, INVALID_ID, "blockLength")
        .add_token(2, 1, Signal::Encoding, LE, PrimitiveType::Uint8, INVALID_ID, "numInGroup")
        .add_token(0, 0, Signal::EndComposite, LE, NONE, INVALID_ID, "groupSizeEncoding");
}

fn field(ir: &mut Ir, name: &str, id: u16, ty: PrimitiveType, size: u32) {
    ir.add_token(0, 0, Signal::BeginField, LE, NONE, id, name)
        .add_token(0, size, Signal::Encoding, LE, ty, INVALID_ID, ty.name())
        .add_token(0, 0, Signal::EndField, LE, NONE, id, name);
}

/// One group of elements holding a single uint32 field.
pub fn reference_group_ir() -> Ir {
    let mut ir = Ir::new();
    ir.add_token(0, VARIABLE_SIZE, Signal::BeginMessage, LE, NONE, GROUP_TEMPLATE_ID, "MessageWithRepeatingGroup")
        .add_token(0, 0, Signal::BeginGroup, LE, NONE, 10, "GroupName");
    dimension(&mut ir);
    field(&mut ir, "FieldName", 20, PrimitiveType::Uint32, 4);
    ir.add_token(0, 0, Signal::EndGroup, LE, NONE, 10, "GroupName")
        .add_token(0, VARIABLE_SIZE, Signal::EndMessage, LE, NONE, GROUP_TEMPLATE_ID, "MessageWithRepeatingGroup");
    ir
}

/// `Order { id: uint32, legs: [{ leg: uint8, fills: [{ qty: uint16 }] }] }`
pub fn nested_ir() -> Ir {
    let mut ir = Ir::new();
    ir.add_token(0, 4, Signal::BeginMessage, LE, NONE, NESTED_TEMPLATE_ID, "Order");
    field(&mut ir, "id", 1, PrimitiveType::Uint32, 4);
    ir.add_token(0, 0, Signal::BeginGroup, LE, NONE, 10, "legs");
    dimension(&mut ir);
    field(&mut ir, "leg", 11, PrimitiveType::Uint8, 1);
    ir.add_token(0, 0, Signal::BeginGroup, LE, NONE, 20, "fills");
    dimension(&mut ir);
    field(&mut ir, "qty", 21, PrimitiveType::Uint16, 2);
    ir.add_token(0, 0, Signal::EndGroup, LE, NONE, 20, "fills")
        .add_token(0, 0, Signal::EndGroup, LE, NONE, 10, "legs")
        .add_token(0, 4, Signal::EndMessage, LE, NONE, NESTED_TEMPLATE_ID, "Order");
    ir
}

/// Both messages in one stream.
pub fn combined_ir() -> Ir {
    let mut ir = reference_group_ir();
    ir.extend(nested_ir().tokens().iter().cloned());
    ir
}

/// Buffer for [`reference_group_ir`] with the given element values.
pub fn reference_group_buffer(values: &[u32]) -> Vec<u8> {
    let mut buf = 4u16.to_le_bytes().to_vec();
    buf.push(values.len() as u8);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// Buffer for [`nested_ir`]: one entry per leg, holding its fill quantities.
pub fn nested_buffer(id: u32, legs: &[Vec<u16>]) -> Vec<u8> {
    let mut buf = id.to_le_bytes().to_vec();
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.push(legs.len() as u8);
    for (i, fills) in legs.iter().enumerate() {
        buf.push(i as u8);
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.push(fills.len() as u8);
        for qty in fills {
            buf.extend_from_slice(&qty.to_le_bytes());
        }
    }
    buf
}

/// Prefix `body` with a header naming `template_id`.
pub fn with_header(template_id: u16, body: &[u8]) -> Vec<u8> {
    let mut buf = template_id.to_le_bytes().to_vec();
    buf.extend_from_slice(body);
    buf
}

/// Prefix `body` with a [`full_header_ir`] header.
pub fn with_full_header(block_length: u16, template_id: u16, version: u16, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + body.len());
    for v in [block_length, template_id, version, 0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.extend_from_slice(body);
    buf
}
