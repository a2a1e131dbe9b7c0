use criterion::{black_box, criterion_group, criterion_main, Criterion};
use log::LevelFilter;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::sync::Once;
use std::time::Duration;
use tempfile::tempdir;
use text_logger::{Attr, Handler, HandlerOptions, Level, Record, TextHandler};

static LOG4RS_INIT: Once = Once::new();

#[derive(Debug, Clone, Serialize)]
struct TestEvent {
    id: i32,
    active: bool,
    data: [u8; 16],
    large_number: u64,
    description: String,
}

impl std::fmt::Display for TestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event[id={}, active={}, data={:?}, large_number={}, desc={}]",
            self.id, self.active, self.data, self.large_number, self.description)
    }
}

fn test_event() -> TestEvent {
    TestEvent {
        id: 42,
        active: true,
        data: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
        large_number: u64::MAX,
        description: "This is a longer description that includes some special characters !@#$%^&*() \
                    and provides more context about the event. It also contains some metrics like \
                    CPU: 95%, Memory: 2.5GB, Network: 1.2Gbps".to_string(),
    }
}

fn record_for(i: usize, event: &TestEvent) -> Record {
    let mut record = Record::now(Level::INFO, "Test perf");
    record.add_attrs([
        Attr::uint64("iteration", i as u64),
        Attr::int("id", event.id.into()),
        Attr::bool("active", event.active),
        Attr::uint64("large_number", event.large_number),
        Attr::string("desc", event.description.as_str()),
        Attr::duration("elapsed", Duration::from_micros(1234)),
    ]);
    record
}

fn setup_log4rs(log_file: &str) {
    LOG4RS_INIT.call_once(|| {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} - {m}{n}")))
            .append(true)
            .build(log_file)
            .unwrap();

        let config = Config::builder()
            .appender(Appender::builder().build("logfile", Box::new(logfile)))
            .build(Root::builder().appender("logfile").build(LevelFilter::Info))
            .unwrap();

        log4rs::init_config(config).unwrap();
    });
}

/// Formatting cost alone: every sink write is discarded.
fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("Formatting");
    let event = test_event();

    let plain = TextHandler::new(io::sink());
    group.bench_function("text_handler", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            plain.handle(black_box(&record_for(i, &event))).unwrap();
        });
    });

    let grouped = TextHandler::with_options(io::sink(), HandlerOptions::new().add_source(true))
        .with_attrs(vec![
            Attr::string("service", "perf"),
            Attr::any("event", event.clone()),
        ])
        .with_group("req");
    group.bench_function("text_handler_preformatted_groups", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            grouped.handle(black_box(&record_for(i, &event))).unwrap();
        });
    });

    let replacing = TextHandler::with_options(
        io::sink(),
        HandlerOptions::new().replace_attr(|_groups, a: Attr| Attr::new(a.key.to_uppercase(), a.value)),
    );
    group.bench_function("text_handler_replace_attr", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            replacing.handle(black_box(&record_for(i, &event))).unwrap();
        });
    });

    group.finish();
}

/// Full I/O cost against the usual alternatives.
fn bench_logging_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Logging Comparison");
    group.sample_size(10); // Fewer samples due to I/O operations

    let dir = tempdir().unwrap();
    let event = test_event();

    let file = File::create(dir.path().join("text.log")).unwrap();
    let handler = TextHandler::new(io::BufWriter::new(file));
    group.bench_function("text_handler_file", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            handler.handle(&record_for(i, &event)).unwrap();
        });
    });
    handler.flush().unwrap();

    let log4rs_file = dir.path().join("log4rs.log");
    setup_log4rs(log4rs_file.to_str().unwrap());
    group.bench_function("log4rs_file", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            log::info!("Test perf: iteration={}, event={}", i, event);
        });
    });

    let appender = tracing_appender::rolling::never(dir.path(), "tracing.log");
    let (writer, _guard) = tracing_appender::non_blocking(appender);
    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        group.bench_function("tracing_fmt_non_blocking", |b| {
            let mut i = 0;
            b.iter(|| {
                i += 1;
                tracing::info!(
                    iteration = i,
                    id = event.id,
                    active = event.active,
                    large_number = event.large_number,
                    desc = %event.description,
                    "Test perf"
                );
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_formatting, bench_logging_comparison);
criterion_main!(benches);
