use chatrelay_tokens as irc;
use criterion as c;
use criterion::{criterion_group, criterion_main};

const MESSAGE: &str = ":alice!~al@localhost PRIVMSG #rust,#golang,bob,carol :is this line too long or is \
it just the right length for a chat message that people would actually send to a channel?\r\n";

fn message(c: &mut c::Criterion) {
    let mut stream = Vec::with_capacity(64 * MESSAGE.len());
    (0..64).for_each(|_| stream.extend_from_slice(MESSAGE.as_bytes()));

    c.bench_function("Message::parse()", |b| {
        b.iter(|| {
            let msg = irc::Message::parse(c::black_box(MESSAGE)).unwrap();
            c::black_box(msg.args());
        })
    })
    .bench_function("Framer::extract_lines() 64 lines in 7-byte reads", |b| {
        b.iter(|| {
            let mut framer = irc::Framer::new();
            for chunk in stream.chunks(7) {
                framer.append(chunk);
                for line in framer.extract_lines() {
                    c::black_box(line.unwrap());
                }
            }
        })
    });
}

criterion_group!(benches, message);
criterion_main!(benches);
