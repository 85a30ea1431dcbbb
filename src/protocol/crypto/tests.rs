mod authenticator;
mod secretbox;
