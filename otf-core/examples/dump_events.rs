use std::ops::ControlFlow;

use otf_core::{
    ByteOrder, DispatchIndex, ErrorEvent, Field, Group, Ir, Listener, PrimitiveType, Signal, INVALID_ID,
};

const LE: ByteOrder = ByteOrder::LittleEndian;
const NONE: PrimitiveType = PrimitiveType::None;

fn main() {
    let mut header = Ir::new();
    header
        .add_token(0, 0, Signal::BeginComposite, LE, NONE, INVALID_ID, "messageHeader")
        .add_token(0, 2, Signal::Encoding, LE, PrimitiveType::Uint16, INVALID_ID, "templateId")
        .add_token(0, 0, Signal::EndComposite, LE, NONE, INVALID_ID, "messageHeader");

    let mut ir = Ir::new();
    ir.add_token(0, 0, Signal::BeginMessage, LE, NONE, 1, "Car")
        .add_token(0, 0, Signal::BeginField, LE, NONE, 1, "modelYear")
        .add_token(0, 2, Signal::Encoding, LE, PrimitiveType::Uint16, INVALID_ID, "uint16")
        .add_token(0, 0, Signal::EndField, LE, NONE, 1, "modelYear")
        .add_token(0, 0, Signal::BeginField, LE, NONE, 2, "code")
        .add_token(0, 6, Signal::Encoding, LE, PrimitiveType::Char, INVALID_ID, "char")
        .add_token(0, 0, Signal::EndField, LE, NONE, 2, "code")
        .add_token(0, 0, Signal::BeginGroup, LE, NONE, 3, "fuelFigures")
        .add_token(0, 0, Signal::BeginComposite, LE, NONE, INVALID_ID, "groupSizeEncoding")
        .add_token(0, 2, Signal::Encoding, LE, PrimitiveType::Uint16, INVALID_ID, "blockLength")
        .add_token(2, 1, Signal::Encoding, LE, PrimitiveType::Uint8, INVALID_ID, "numInGroup")
        .add_token(0, 0, Signal::EndComposite, LE, NONE, INVALID_ID, "groupSizeEncoding")
        .add_token(0, 0, Signal::BeginField, LE, NONE, 4, "mpg")
        .add_token(0, 4, Signal::Encoding, LE, PrimitiveType::Float, INVALID_ID, "float")
        .add_token(0, 0, Signal::EndField, LE, NONE, 4, "mpg")
        .add_token(0, 0, Signal::EndGroup, LE, NONE, 3, "fuelFigures")
        .add_token(0, 0, Signal::EndMessage, LE, NONE, 1, "Car");

    let index = match DispatchIndex::build(&ir) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("bad schema: {}", e);
            std::process::exit(1);
        }
    };

    let mut buffer = Vec::new();
    buffer.extend_from_slice(&1u16.to_le_bytes());
    buffer.extend_from_slice(&2013u16.to_le_bytes());
    buffer.extend_from_slice(b"ABC\0\0\0");
    buffer.extend_from_slice(&4u16.to_le_bytes());
    buffer.push(2);
    buffer.extend_from_slice(&30.0f32.to_le_bytes());
    buffer.extend_from_slice(&35.5f32.to_le_bytes());

    println!("Buffer: {:02x?}\n", buffer);
    println!("Events:");

    let mut listener = Listener::new(&ir, &index);
    if let Err(e) = listener.dispatch_message_by_header(&header, "templateId") {
        eprintln!("cannot dispatch: {}", e);
        std::process::exit(1);
    }
    listener.reset_for_decode(&buffer, buffer.len());

    let outcome = listener.subscribe_with_completion(
        &mut |f: &Field<'_>| {
            let value = f.value().map(|v| v.to_string()).unwrap_or_else(|e| e.to_string());
            let tag = if f.is_header() { "header" } else { "field" };
            println!("  {} {} @{}+{} = {}", tag, f.name(), f.offset(), f.encoded_len(), value);
            ControlFlow::Continue(())
        },
        &mut |g: &Group<'_>| {
            println!("  group {} {:?} {}/{}", g.name(), g.event(), g.iteration() + 1, g.num_in_group());
            ControlFlow::Continue(())
        },
        &mut |e: &ErrorEvent<'_>| {
            println!("  error at token {} offset {}: {}", e.token_index(), e.buffer_offset(), e.message());
            ControlFlow::Continue(())
        },
        &mut || {
            println!("  completed");
            ControlFlow::Continue(())
        },
    );

    println!("\nOutcome: {:?}", outcome);
}
