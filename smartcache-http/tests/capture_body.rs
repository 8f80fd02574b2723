use std::convert::Infallible;
use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::stream;
use http::HeaderMap;
use http_body::Frame;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use smartcache_http::{CaptureBody, CommitFn};

type Committed = Arc<Mutex<Vec<Bytes>>>;

fn recorder() -> (Committed, CommitFn) {
    let committed = Committed::default();
    let sink = committed.clone();
    let commit: CommitFn = Box::new(move |bytes| sink.lock().unwrap().push(bytes));
    (committed, commit)
}

/// Client receives every chunk in order and the store receives the same bytes once.
#[tokio::test]
async fn test_commits_forwarded_bytes_once() {
    let (committed, commit) = recorder();
    let stream = stream::iter(vec![
        Ok::<_, Infallible>(Frame::data(Bytes::from("hello "))),
        Ok::<_, Infallible>(Frame::data(Bytes::from("world"))),
    ]);
    let body = CaptureBody::new(StreamBody::new(stream), commit);

    let received = body.collect().await.unwrap().to_bytes();

    assert_eq!(received, Bytes::from("hello world"));
    assert_eq!(*committed.lock().unwrap(), vec![Bytes::from("hello world")]);
}

/// A body that reports its end with the last data frame still commits.
#[tokio::test]
async fn test_commits_when_end_reported_with_last_frame() {
    let (committed, commit) = recorder();
    let mut body = CaptureBody::new(Full::new(Bytes::from("A")), commit);

    let frame = body.frame().await.unwrap().unwrap();
    assert_eq!(frame.into_data().unwrap(), Bytes::from("A"));
    assert!(!body.is_capturing());
    assert_eq!(*committed.lock().unwrap(), vec![Bytes::from("A")]);
}

/// An empty body is committed without being polled.
#[tokio::test]
async fn test_empty_body_commits_immediately() {
    let (committed, commit) = recorder();
    let body = CaptureBody::new(Empty::<Bytes>::new(), commit);

    assert!(!body.is_capturing());
    assert_eq!(*committed.lock().unwrap(), vec![Bytes::new()]);
}

/// A failing body is forwarded as is and never committed.
#[tokio::test]
async fn test_error_abandons_capture() {
    let (committed, commit) = recorder();
    let stream = stream::iter(vec![
        Ok(Frame::data(Bytes::from("partial"))),
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "upstream gone")),
    ]);
    let body = CaptureBody::new(StreamBody::new(stream), commit);

    assert!(body.collect().await.is_err());
    assert!(committed.lock().unwrap().is_empty());
}

/// Dropping the body before its end (client abort) never commits.
#[tokio::test]
async fn test_drop_before_end_abandons_capture() {
    let (committed, commit) = recorder();
    let stream = stream::iter(vec![
        Ok::<_, Infallible>(Frame::data(Bytes::from("first"))),
        Ok::<_, Infallible>(Frame::data(Bytes::from("second"))),
    ]);
    let mut body = CaptureBody::new(StreamBody::new(stream), commit);

    let _ = body.frame().await;
    drop(body);

    assert!(committed.lock().unwrap().is_empty());
}

/// Trailers can't be replayed, so such responses are not stored.
#[tokio::test]
async fn test_trailers_abandon_capture() {
    let (committed, commit) = recorder();
    let stream = stream::iter(vec![
        Ok::<_, Infallible>(Frame::data(Bytes::from("body"))),
        Ok::<_, Infallible>(Frame::trailers(HeaderMap::new())),
    ]);
    let body = CaptureBody::new(StreamBody::new(stream), commit);

    let collected = body.collect().await.unwrap();
    assert!(collected.trailers().is_some());
    assert_eq!(collected.to_bytes(), Bytes::from("body"));
    assert!(committed.lock().unwrap().is_empty());
}
