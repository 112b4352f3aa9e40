use std::io::{BufRead, Write};

use crate::{
    embedding::Embedder,
    error::{Error, Result},
    pipeline::Pipeline,
};

pub const EMPTY_QUESTION_MESSAGE: &str = "Please type a question first.";

const BANNER: &str =
    "Company knowledge base. Ask a question, or type 'exit' to quit.";

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Read questions line by line from `input` and write answers to `output`
/// until `exit`, `quit` or end of input.
///
/// Retrieval failures are shown to the user and the loop continues; any
/// other error ends the session.
pub fn run_chat<E, R, W>(
    pipeline: &mut Pipeline<E>,
    mut input: R,
    mut output: W,
) -> Result<()>
where
    E: Embedder,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{BANNER}")?;

    let mut line = String::new();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            writeln!(output, "{EMPTY_QUESTION_MESSAGE}")?;
            continue;
        }
        if is_exit(question) {
            break;
        }

        match pipeline.answer(question) {
            Ok(answer) => writeln!(output, "\n{}\n", answer.text)?,
            Err(Error::Retrieval(message)) => {
                writeln!(output, "\n{message}\n")?
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        answer::GREETING_MESSAGE,
        testing::{BagOfWordsEmbedder, FailingEmbedder, bag_of_words},
        vector_db::{ChunkMetadata, Collection, VectorDb},
    };

    const POLICY: &str =
        "Employees get 12 sick leaves per year. Working hours are 9 to 6.";

    fn collection() -> (tempfile::TempDir, Collection) {
        let tmp = tempfile::tempdir().unwrap();
        let db = VectorDb::open(&tmp.path().join("index.redb")).unwrap();
        let collection = db.create_collection("kb").unwrap();
        collection
            .add(
                &["chunk-0".into()],
                &[POLICY.into()],
                &[bag_of_words(POLICY)],
                &[ChunkMetadata {
                    source: "handbook.pdf".into(),
                    page: 1,
                    chunk: 0,
                }],
            )
            .unwrap();
        (tmp, collection)
    }

    fn chat<E: Embedder>(pipeline: &mut Pipeline<E>, input: &str) -> String {
        let mut output = Vec::new();
        run_chat(pipeline, input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn answers_until_exit() {
        let (_tmp, collection) = collection();
        let mut pipeline =
            Pipeline::new(BagOfWordsEmbedder::default(), collection);

        let transcript = chat(
            &mut pipeline,
            "How many sick leaves do employees get?\nexit\nhello\n",
        );
        assert!(transcript.contains("Employees get 12 sick leaves per year."));
        assert!(!transcript.contains(GREETING_MESSAGE));
    }

    #[test]
    fn blank_line_asks_for_a_question() {
        let (_tmp, collection) = collection();
        let mut pipeline =
            Pipeline::new(BagOfWordsEmbedder::default(), collection);

        let transcript = chat(&mut pipeline, "   \nquit\n");
        assert!(transcript.contains(EMPTY_QUESTION_MESSAGE));
    }

    #[test]
    fn end_of_input_ends_session() {
        let (_tmp, collection) = collection();
        let mut pipeline =
            Pipeline::new(BagOfWordsEmbedder::default(), collection);

        let transcript = chat(&mut pipeline, "hi");
        assert!(transcript.contains(GREETING_MESSAGE));
    }

    #[test]
    fn retrieval_errors_are_shown_and_loop_continues() {
        let (_tmp, collection) = collection();
        let mut pipeline = Pipeline::new(FailingEmbedder, collection);

        let transcript = chat(&mut pipeline, "sick leaves\nworking hours\n");
        assert_eq!(
            transcript.matches("Error querying vector store:").count(),
            2
        );
    }
}
