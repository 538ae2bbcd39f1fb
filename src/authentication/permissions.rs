use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[ActionType::ManageOwnProfile, ActionType::ManageOwnRecipes],
    ),
    (
        UserRole::Staff,
        &[
            ActionType::ManageOwnProfile,
            ActionType::ManageOwnRecipes,
            ActionType::ViewAllContent,
        ],
    ),
    (
        UserRole::Superuser,
        &[
            ActionType::ManageOwnProfile,
            ActionType::ManageOwnRecipes,
            ActionType::ViewAllContent,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    ManageOwnProfile,
    ManageOwnRecipes,

    ViewAllContent,
    ManageUsers,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if session.role != *role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}
