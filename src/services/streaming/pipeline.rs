//! Driving loop: pull fragments from the model, feed the accumulator

use super::accumulator::{RunReport, StreamingAccumulator};
use super::sink::DisplaySink;
use crate::services::ml::{Fragment, SummaryModel};
use crate::types::{GenerationRequest, SummarizeError};
use std::time::Duration;

/// Forward every fragment to the accumulator until the terminal one.
///
/// A model error or a failed display push aborts the run. If the source
/// runs dry without a terminal fragment, an empty one is delivered so the
/// run always ends the same way.
pub fn run_stream<I, S>(
    fragments: I,
    mut accumulator: StreamingAccumulator<S>,
) -> Result<RunReport, SummarizeError>
where
    I: IntoIterator<Item = anyhow::Result<Fragment>>,
    S: DisplaySink,
{
    for fragment in fragments {
        let fragment = fragment.map_err(SummarizeError::Model)?;
        accumulator.on_fragment(&fragment.text, fragment.is_final)?;
        if fragment.is_final {
            break;
        }
    }

    if !accumulator.state().is_finished() {
        tracing::warn!("[STREAM] Fragment source ended without a terminal fragment");
        accumulator.on_fragment("", true)?;
    }

    Ok(accumulator.finish())
}

/// One complete blocking summarization run against `model`
pub fn summarize_blocking<S: DisplaySink>(
    model: &mut dyn SummaryModel,
    request: &GenerationRequest,
    sink: S,
    pacing: Duration,
) -> Result<RunReport, SummarizeError> {
    tracing::info!(
        "[GENERATION] Starting run on {} ({} words in, ~{} words target)",
        model.name(),
        request.dialogue().split_whitespace().count(),
        request.target_length()
    );

    let fragments = model.generate(request).map_err(SummarizeError::Model)?;
    let report = run_stream(fragments, StreamingAccumulator::new(sink, pacing))?;

    tracing::info!(
        "[GENERATION] Run complete: {} words, {} fragments in {:?}",
        report.word_count,
        report.fragments,
        report.elapsed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ml::StubSummarizer;
    use crate::services::streaming::TerminalSink;
    use crate::types::{DecodingParams, SinkError};

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl DisplaySink for Collect {
        fn push(&mut self, text: &str) -> Result<(), SinkError> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    fn fragments(parts: &[&str]) -> Vec<anyhow::Result<Fragment>> {
        let mut out: Vec<_> = parts.iter().map(|p| Ok(Fragment::text(*p))).collect();
        out.push(Ok(Fragment::terminal()));
        out
    }

    #[test]
    fn final_display_is_concatenation_in_order() {
        let parts = ["", "Tom ", "and ", "Sue ", "meet ", "at ", "noon."];
        let mut sink = Collect::default();
        let report = run_stream(
            fragments(&parts),
            StreamingAccumulator::new(&mut sink, Duration::ZERO),
        )
        .unwrap();

        assert_eq!(report.text, parts.concat());
        assert_eq!(sink.0.last().unwrap(), &format!("###### {}", parts.concat()));
        assert_eq!(sink.0.len(), parts.len() + 1);
        assert_eq!(report.word_count, 6);
    }

    #[test]
    fn model_error_aborts_the_run() {
        let source = vec![
            Ok(Fragment::text("Half ")),
            Err(anyhow::anyhow!("decoder exploded")),
            Ok(Fragment::text("never seen")),
        ];
        let mut sink = Collect::default();
        let err = run_stream(source, StreamingAccumulator::new(&mut sink, Duration::ZERO)).unwrap_err();

        assert!(matches!(err, SummarizeError::Model(_)));
        assert_eq!(sink.0, vec!["###### Half ".to_string()]);
    }

    #[test]
    fn missing_terminal_fragment_is_synthesized() {
        let source = vec![Ok(Fragment::text("abc"))];
        let mut sink = Collect::default();
        let report = run_stream(source, StreamingAccumulator::new(&mut sink, Duration::ZERO)).unwrap();
        assert_eq!(report.fragments, 2);
        assert_eq!(sink.0.len(), 2);
    }

    #[test]
    fn fragments_after_terminal_are_ignored() {
        let source = vec![
            Ok(Fragment::text("kept")),
            Ok(Fragment::terminal()),
            Ok(Fragment::text("dropped")),
        ];
        let report = run_stream(source, StreamingAccumulator::new(Collect::default(), Duration::ZERO)).unwrap();
        assert_eq!(report.text, "kept");
    }

    #[test]
    fn blocking_run_with_stub_model_writes_to_terminal() -> anyhow::Result<()> {
        let request = GenerationRequest::new(
            "Amanda: I baked cookies. Do you want some? Jerry: Sure! Amanda: I'll bring you tomorrow :-)",
            DecodingParams::default(),
        )?;
        let mut model = StubSummarizer::new();
        let mut out = Vec::new();
        let report = summarize_blocking(&mut model, &request, TerminalSink::new(&mut out), Duration::ZERO)?;

        assert_eq!(report.text.trim(), "Amanda: I");
        assert_eq!(String::from_utf8(out)?, format!("###### {}", report.text));
        Ok(())
    }
}
