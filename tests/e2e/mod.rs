// End-to-end tests for the synthesis pipelines
//
// A wiremock server stands in for the speech service: batch submission,
// job status, artifact storage and realtime synthesis endpoints. Every
// test gets its own mock server and temporary directories, so tests run
// in parallel.

mod test_batch;
mod test_cli;
mod test_realtime;
