diesel::table! {
    learn_courses (id) {
        id -> Uuid,
        title -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    learn_modules (id) {
        id -> Uuid,
        course_id -> Nullable<Uuid>,
        title -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    learn_users (id) {
        id -> Uuid,
        display_name -> Text,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    learn_questions (id) {
        id -> Uuid,
        module_id -> Uuid,
        difficulty -> Text,
        question_type -> Text,
        prompt -> Text,
        options -> Array<Text>,
        answer -> Text,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    learn_quizzes (id) {
        id -> Uuid,
        module_id -> Uuid,
        created_by -> Uuid,
        size -> Int4,
        question_type -> Nullable<Text>,
        difficulty -> Nullable<Text>,
        questions -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    learn_responses (id) {
        id -> Uuid,
        quiz_id -> Uuid,
        user_id -> Uuid,
        answers -> Jsonb,
        score -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    learn_progress (id) {
        id -> Uuid,
        user_id -> Uuid,
        course_id -> Uuid,
        completed_percentage -> Float8,
        completed_modules -> Array<Uuid>,
        average_score -> Nullable<Float8>,
        last_accessed_at -> Timestamptz,
        version -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(learn_modules -> learn_courses (course_id));
diesel::joinable!(learn_questions -> learn_modules (module_id));
diesel::joinable!(learn_quizzes -> learn_modules (module_id));
diesel::joinable!(learn_responses -> learn_quizzes (quiz_id));

diesel::allow_tables_to_appear_in_same_query!(
    learn_courses,
    learn_modules,
    learn_users,
    learn_questions,
    learn_quizzes,
    learn_responses,
    learn_progress,
);
