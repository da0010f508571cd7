pub mod domain;
pub mod grading;
pub mod normalize;
pub mod ports;

pub use domain::{
    Answer, Attempt, Flashcard, FlashcardSet, Material, NewQuiz, OwnedLookup, Question, Quiz,
    ScheduleEntry, ScheduleItem, StoredObject, TopicRequest, User, UserCredentials, UserId,
};
pub use grading::{grade_attempt, Grade, SubmittedAnswer};
pub use normalize::NormalizeError;
pub use ports::{
    DatabaseService, ObjectStorageService, PortError, PortResult, StudyAiService,
    TopicContentService,
};
