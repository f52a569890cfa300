pub mod spotify_connect;
