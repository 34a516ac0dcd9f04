use std::hint::black_box;
use av_http::codec::{RequestDecoder, RequestParser};
use av_http::protocol::Request;
use bencher::{TestCase, TestFile};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

static SMALL_HEADER: TestFile = TestFile::new("get_small.txt", include_str!("../resources/request/get_small.txt"));
static LARGE_HEADER: TestFile = TestFile::new("get_large.txt", include_str!("../resources/request/get_large.txt"));
static POST_FORM: TestFile = TestFile::new("post_form.txt", include_str!("../resources/request/post_form.txt"));

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("small_header_decoder", SMALL_HEADER),
        TestCase::normal("large_header_decoder", LARGE_HEADER),
        TestCase::normal("post_form_decoder", POST_FORM),
    ]
}

fn benchmark_request_decoder(criterion: &mut Criterion) {
    let test_cases = create_test_cases();
    let mut group = criterion.benchmark_group("request_decoder");

    for case in test_cases {
        group.sample_size(case.group().sample_size());
        group.throughput(Throughput::Bytes(case.file().bytes().len() as u64));
        group.bench_with_input(BenchmarkId::new(case.name(), case.file().file_name()), &case, |b, case| {
            let mut request_decoder = RequestDecoder::new();
            b.iter_batched_ref(
                || BytesMut::from(case.file().content()),
                |bytes_mut| {
                    let request = request_decoder.decode(bytes_mut).expect("input should be a valid http request").unwrap();
                    black_box(request);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_request_parser_chunks(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("request_parser_chunks");
    let content = LARGE_HEADER.bytes();
    group.throughput(Throughput::Bytes(content.len() as u64));

    for chunk_size in [1, 16, 256, content.len()] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &chunk_size, |b, &chunk_size| {
            let mut parser = RequestParser::new();
            b.iter(|| {
                parser.reset();
                let mut request = Request::new();
                for chunk in content.chunks(chunk_size) {
                    black_box(parser.parse(&mut request, chunk));
                }
                black_box(request);
            });
        });
    }

    group.finish();
}

criterion_group!(decoder, benchmark_request_decoder, benchmark_request_parser_chunks);
criterion_main!(decoder);
