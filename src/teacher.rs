use crate::EdError;
use crate::builder::EpisodeBuilder;
use crate::config::{PerspectivePolicy, TeacherOptions};
use crate::dataset::{require_dataset, split_path};
use crate::embeddings::Embeddings;
use crate::episode::{Episode, Perspective, TurnRecord};
use crate::keywords::LexiconModel;
use crate::message::Message;
use std::path::Path;
use std::sync::Arc;

/// Indexed access to a built episode list.
pub trait Teacher {
    fn episode_count(&self) -> usize;

    /// Number of turns across all episodes.
    fn example_count(&self) -> usize;

    fn episode_len(&self, episode_idx: usize) -> Option<usize>;

    fn get(&self, episode_idx: usize, turn_idx: usize) -> Result<Message, EdError>;

    /// Every message in episode order. Each call starts from the beginning.
    fn iter(&self) -> Messages<'_, Self>
    where
        Self: Sized,
    {
        Messages {
            teacher: self,
            episode: 0,
            turn: 0,
        }
    }
}

pub struct Messages<'a, T: Teacher> {
    teacher: &'a T,
    episode: usize,
    turn: usize,
}

impl<T: Teacher> Iterator for Messages<'_, T> {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        loop {
            let len = self.teacher.episode_len(self.episode)?;
            if self.turn >= len {
                self.episode += 1;
                self.turn = 0;
                continue;
            }
            let msg = self.teacher.get(self.episode, self.turn).ok()?;
            self.turn += 1;
            return Some(msg);
        }
    }
}

/// A turn together with whether it closes its episode.
#[derive(Debug, Clone, Copy)]
pub struct TurnView<'a> {
    pub turn: &'a TurnRecord,
    pub is_last_turn: bool,
}

/// Serves episodes of one split. Clones made with [`DialogueTeacher::share`]
/// read the same list.
#[derive(Debug)]
pub struct DialogueTeacher {
    data: Arc<Vec<Episode>>,
    split: String,
    perspective: Perspective,
    num_examples: usize,
}

impl DialogueTeacher {
    /// Load and build the split named by `opts.datatype` under `datapath`.
    pub fn new(opts: &TeacherOptions, datapath: &Path) -> Result<Self, EdError> {
        let perspective = opts.resolve_perspective()?;
        let split = opts.split().to_string();
        let path = split_path(datapath, &split);
        require_dataset(&path)?;
        log::info!("perspective {perspective} for split {split}");

        let embeddings = match &opts.embedding_file_prefix {
            Some(prefix) => Some(Embeddings::load(&Embeddings::path_for(prefix, &split))?),
            None => None,
        };
        let token_model = match (&opts.external_token_model_path, opts.prepend_count) {
            (_, 0) => None,
            (Some(p), _) => Some(LexiconModel::load(p)?),
            (None, _) => {
                return Err(EdError::Config(
                    "prepend_count is set but no token model path was given".into(),
                ));
            }
        };

        let mut builder =
            EpisodeBuilder::new(perspective).remove_political(opts.remove_political_convos);
        if let Some(emb) = &embeddings {
            builder = builder.with_embeddings(emb);
        }
        if let Some(model) = &token_model {
            builder = builder.with_token_model(model, opts.prepend_count);
        }
        let episodes = builder.build_from_path(&path)?;

        Ok(Self::from_episodes(episodes, split, perspective))
    }

    pub fn from_episodes(episodes: Vec<Episode>, split: impl Into<String>, perspective: Perspective) -> Self {
        let num_examples = episodes.iter().map(Episode::len).sum();
        Self {
            data: Arc::new(episodes),
            split: split.into(),
            perspective,
            num_examples,
        }
    }

    /// A second teacher over the same episodes, without rebuilding.
    pub fn share(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            split: self.split.clone(),
            perspective: self.perspective,
            num_examples: self.num_examples,
        }
    }

    pub fn shares_data_with(&self, other: &DialogueTeacher) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.data
    }

    pub fn view(&self, episode_idx: usize, turn_idx: usize) -> Result<TurnView<'_>, EdError> {
        let ep = self.data.get(episode_idx).ok_or_else(|| {
            EdError::Index(format!(
                "episode {episode_idx} out of range ({} episodes)",
                self.data.len()
            ))
        })?;
        let turn = ep.turns.get(turn_idx).ok_or_else(|| {
            EdError::Index(format!(
                "turn {turn_idx} out of range (episode {episode_idx} has {} turns)",
                ep.len()
            ))
        })?;
        Ok(TurnView {
            turn,
            is_last_turn: turn_idx + 1 >= ep.len(),
        })
    }
}

impl Teacher for DialogueTeacher {
    fn episode_count(&self) -> usize {
        self.data.len()
    }

    fn example_count(&self) -> usize {
        self.num_examples
    }

    fn episode_len(&self, episode_idx: usize) -> Option<usize> {
        self.data.get(episode_idx).map(Episode::len)
    }

    fn get(&self, episode_idx: usize, turn_idx: usize) -> Result<Message, EdError> {
        let view = self.view(episode_idx, turn_idx)?;
        Ok(Message::from_turn(view.turn, view.is_last_turn))
    }
}

/// Generates experiencer utterances: responder-text episodes only, with the
/// situation (and optionally the emotion) given up front.
#[derive(Debug)]
pub struct ExperiencerTeacher {
    inner: DialogueTeacher,
    include_emotion: bool,
}

impl ExperiencerTeacher {
    pub fn new(opts: &TeacherOptions, datapath: &Path) -> Result<Self, EdError> {
        let opts = Self::options(opts);
        let inner = DialogueTeacher::new(&opts, datapath)?;
        Ok(Self {
            inner,
            include_emotion: opts.include_emotion,
        })
    }

    /// Wrap an existing teacher. Its episodes are used as-is.
    pub fn from_teacher(inner: DialogueTeacher, include_emotion: bool) -> Self {
        Self {
            inner,
            include_emotion,
        }
    }

    /// `opts` with the perspective pinned to `responder`.
    pub fn options(opts: &TeacherOptions) -> TeacherOptions {
        TeacherOptions {
            perspective: PerspectivePolicy::Fixed(Perspective::Responder),
            train_experiencer_only: false,
            ..opts.clone()
        }
    }

    pub fn share(&self) -> Self {
        Self {
            inner: self.inner.share(),
            include_emotion: self.include_emotion,
        }
    }

    pub fn inner(&self) -> &DialogueTeacher {
        &self.inner
    }
}

impl Teacher for ExperiencerTeacher {
    fn episode_count(&self) -> usize {
        self.inner.episode_count()
    }

    fn example_count(&self) -> usize {
        self.inner.example_count()
    }

    fn episode_len(&self, episode_idx: usize) -> Option<usize> {
        self.inner.episode_len(episode_idx)
    }

    fn get(&self, episode_idx: usize, turn_idx: usize) -> Result<Message, EdError> {
        let view = self.inner.view(episode_idx, turn_idx)?;
        let turn = view.turn;
        let text = if turn_idx == 0 {
            let mut text = format!("{}\n{}", turn.situation, turn.context);
            if self.include_emotion {
                text.push_str("\nEmotion: ");
                text.push_str(&turn.prompt);
            }
            text
        } else {
            turn.context.clone()
        };
        Ok(Message::plain(text, turn.label.clone(), view.is_last_turn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SPLIT: &str = "\
conv_id,utterance_idx,context,prompt,speaker_idx,utterance,selfeval,tags
c1,1,joy,I got a new job,1,Guess what!,,
c1,2,joy,I got a new job,2,What?,,
c1,3,joy,I got a new job,1,I got hired_comma_ finally.,,
c1,4,joy,I got a new job,2,Congrats!,,
c2,1,sad,My cat ran away,3,My cat is gone.,,
c2,2,sad,My cat ran away,4,Oh no.,,<POLITICAL>
";

    fn datapath_with(split: &str, content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let path = split_path(dir.path(), split);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        dir
    }

    fn opts(datatype: &str, perspective: &str) -> TeacherOptions {
        TeacherOptions {
            datatype: datatype.into(),
            perspective: perspective.parse().unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn counts_and_get() {
        let dir = datapath_with("train", SPLIT);
        let teacher = DialogueTeacher::new(&opts("train", "both"), dir.path()).unwrap();
        // c1: experiencer (2 turns) + responder (1), c2: experiencer (1)
        assert_eq!(teacher.episode_count(), 3);
        assert_eq!(teacher.example_count(), 4);
        assert_eq!(teacher.split(), "train");

        let first = teacher.get(0, 0).unwrap();
        assert_eq!(first.text, "Guess what!");
        assert_eq!(first.labels, vec!["What?".to_string()]);
        assert_eq!(first.emotion.as_deref(), Some("joy"));
        assert_eq!(first.situation.as_deref(), Some("I got a new job"));
        assert!(!first.episode_done);

        let second = teacher.get(0, 1).unwrap();
        assert_eq!(second.text, "I got hired, finally.");
        assert!(second.episode_done);

        assert!(teacher.get(1, 0).unwrap().episode_done);
    }

    #[test]
    fn out_of_range_is_index_error() {
        let dir = datapath_with("train", SPLIT);
        let teacher = DialogueTeacher::new(&opts("train", "both"), dir.path()).unwrap();
        assert!(matches!(teacher.get(3, 0), Err(EdError::Index(_))));
        assert!(matches!(teacher.get(0, 2), Err(EdError::Index(_))));
    }

    #[test]
    fn datatype_modifier_and_default_policy() {
        let dir = datapath_with("valid", SPLIT);
        let teacher = DialogueTeacher::new(
            &TeacherOptions {
                datatype: "valid:stream".into(),
                ..Default::default()
            },
            dir.path(),
        )
        .unwrap();
        assert_eq!(teacher.perspective(), Perspective::Experiencer);
        assert_eq!(teacher.episode_count(), 2);
        assert!(
            teacher
                .episodes()
                .iter()
                .all(|e| e.perspective == Perspective::Experiencer)
        );
    }

    #[test]
    fn split_missing_from_policy_is_config_error() {
        let dir = datapath_with("test", SPLIT);
        let err = DialogueTeacher::new(&opts("test", "train:both"), dir.path()).unwrap_err();
        assert!(matches!(err, EdError::Config(_)));
    }

    #[test]
    fn missing_dataset_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = DialogueTeacher::new(&opts("train", "both"), dir.path()).unwrap_err();
        assert!(matches!(err, EdError::Config(ref m) if m.contains("train.csv")));
    }

    #[test]
    fn removes_political_conversations() {
        let dir = datapath_with("train", SPLIT);
        let teacher = DialogueTeacher::new(
            &TeacherOptions {
                remove_political_convos: true,
                ..opts("train", "both")
            },
            dir.path(),
        )
        .unwrap();
        assert_eq!(teacher.episode_count(), 2);
        assert!(teacher.episodes().iter().all(|e| e.conv_id == "c1"));
    }

    #[test]
    fn shared_teacher_reads_same_episodes() {
        let dir = datapath_with("train", SPLIT);
        let teacher = DialogueTeacher::new(&opts("train", "both"), dir.path()).unwrap();
        let copy = teacher.share();
        assert!(copy.shares_data_with(&teacher));
        assert_eq!(copy.example_count(), teacher.example_count());
        assert_eq!(copy.get(2, 0).unwrap(), teacher.get(2, 0).unwrap());
    }

    #[test]
    fn iteration_is_restartable() {
        let dir = datapath_with("train", SPLIT);
        let teacher = DialogueTeacher::new(&opts("train", "both"), dir.path()).unwrap();
        let first: Vec<Message> = teacher.iter().collect();
        let second: Vec<Message> = teacher.iter().collect();
        assert_eq!(first.len(), teacher.example_count());
        assert_eq!(first, second);
        assert_eq!(first.iter().filter(|m| m.episode_done).count(), 3);
    }

    #[test]
    fn missing_embedding_file_is_fatal() {
        let dir = datapath_with("train", SPLIT);
        let prefix = dir.path().join("deepmoji_");
        let err = DialogueTeacher::new(
            &TeacherOptions {
                embedding_file_prefix: Some(prefix.to_string_lossy().into_owned()),
                ..opts("train", "both")
            },
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, EdError::Embedding(_)));
    }

    #[test]
    fn token_model_prepends_keywords() {
        let dir = datapath_with("train", SPLIT);
        let model = dir.path().join("keywords.txt");
        std::fs::write(&model, "__label__job hired job\n__label__news guess what\n").unwrap();
        let teacher = DialogueTeacher::new(
            &TeacherOptions {
                external_token_model_path: Some(model),
                prepend_count: 2,
                ..opts("train", "experiencer")
            },
            dir.path(),
        )
        .unwrap();
        let msg = teacher.get(0, 0).unwrap();
        assert_eq!(msg.prepend_ctx.as_deref(), Some("news "));
        assert_eq!(msg.prepend_cand.as_deref(), Some("news "));
        let msg = teacher.get(0, 1).unwrap();
        assert_eq!(msg.prepend_ctx.as_deref(), Some("job "));
        assert_eq!(msg.prepend_cand.as_deref(), Some(""));
    }

    #[test]
    fn missing_token_model_is_fatal() {
        let dir = datapath_with("train", SPLIT);
        let err = DialogueTeacher::new(
            &TeacherOptions {
                external_token_model_path: Some(PathBuf::from("/nonexistent/model.txt")),
                prepend_count: 1,
                ..opts("train", "both")
            },
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, EdError::Config(_)));
    }

    #[test]
    fn experiencer_teacher_prefixes_first_turn_only() {
        let dir = datapath_with("train", SPLIT);
        let teacher = ExperiencerTeacher::new(&opts("train", "experiencer"), dir.path()).unwrap();
        assert_eq!(teacher.inner().perspective(), Perspective::Responder);
        assert_eq!(teacher.episode_count(), 1);

        let msg = teacher.get(0, 0).unwrap();
        assert_eq!(msg.text, "I got a new job\nWhat?");
        assert_eq!(msg.label(), "I got hired, finally.");
        assert!(msg.episode_done);
        assert!(msg.situation.is_none());
        assert!(msg.label_candidates.is_none());
    }

    #[test]
    fn experiencer_teacher_with_emotion() {
        let episodes = EpisodeBuilder::new(Perspective::Responder)
            .build_from_reader(SPLIT.as_bytes())
            .unwrap();
        let inner = DialogueTeacher::from_episodes(episodes, "train", Perspective::Responder);
        let teacher = ExperiencerTeacher::from_teacher(inner, true);
        assert_eq!(
            teacher.get(0, 0).unwrap().text,
            "I got a new job\nWhat?\nEmotion: joy"
        );
    }

    #[test]
    fn experiencer_teacher_ignores_train_experiencer_only() {
        let dir = datapath_with("train", SPLIT);
        let teacher = ExperiencerTeacher::new(
            &TeacherOptions {
                train_experiencer_only: true,
                ..opts("train", "both")
            },
            dir.path(),
        )
        .unwrap();
        assert_eq!(teacher.inner().perspective(), Perspective::Responder);
        assert!(teacher.share().inner().shares_data_with(teacher.inner()));
    }

    #[test]
    fn experiencer_later_turns_unprefixed() {
        let episodes = vec![Episode {
            conv_id: "c9".into(),
            perspective: Perspective::Responder,
            turns: vec![
                TurnRecord {
                    context: "a".into(),
                    label: "b".into(),
                    prompt: "calm".into(),
                    situation: "s".into(),
                    context_embedding: None,
                    candidate_embedding: None,
                    prepend_context: None,
                    prepend_candidate: None,
                    inline_label_candidates: vec![],
                    is_political: false,
                };
                2
            ],
        }];
        let teacher = ExperiencerTeacher::from_teacher(
            DialogueTeacher::from_episodes(episodes, "test", Perspective::Responder),
            true,
        );
        assert_eq!(teacher.get(0, 0).unwrap().text, "s\na\nEmotion: calm");
        let later = teacher.get(0, 1).unwrap();
        assert_eq!(later.text, "a");
        assert!(later.episode_done);
    }
}
